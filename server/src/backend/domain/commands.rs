//! Domain-level command types.
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer maps the public DTOs defined in
//! the `shared` crate to these internal types.

pub mod story {
    /// Input for creating a story after a redemption.
    #[derive(Debug, Clone)]
    pub struct CreateStoryCommand {
        pub description: String,
        pub is_recommending: bool,
        pub goal_id: Option<i64>,
        pub organization_id: Option<i64>,
        /// Decoded content blobs
        pub content: Vec<Vec<u8>>,
        /// Code to consume; the newest live code of the author is used when absent
        pub code: Option<String>,
    }

    /// Owner edit of a story; `None` keeps the stored value.
    /// Moderation state is never touched by an edit.
    #[derive(Debug, Clone, Default)]
    pub struct UpdateStoryCommand {
        pub description: Option<String>,
        pub is_recommending: Option<bool>,
        pub content: Option<Vec<Vec<u8>>>,
    }
}

pub mod organization {
    /// Partial update of an organization's discount policy; `None` keeps the stored value.
    #[derive(Debug, Clone, Default)]
    pub struct UpdateDiscountPolicyCommand {
        pub common_discount: Option<f64>,
        pub max_discount: Option<f64>,
        pub step_amount: Option<u32>,
        pub days_to_step_back: Option<u32>,
    }
}
