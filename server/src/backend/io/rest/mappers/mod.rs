pub mod code_mapper;
pub mod organization_mapper;
pub mod story_mapper;
