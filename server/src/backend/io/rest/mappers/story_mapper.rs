use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::BTreeMap;

use shared::{CreateStoryRequest, FavoriteStoriesResponse, Story, StorySummary, UpdateStoryRequest};

use crate::backend::domain::commands::story::{CreateStoryCommand, UpdateStoryCommand};
use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::DomainStory;

pub struct StoryMapper;

impl StoryMapper {
    /// Convert domain DomainStory to shared Story DTO
    pub fn to_dto(domain: DomainStory) -> Story {
        Story {
            id: domain.id,
            description: domain.description,
            is_recommending: domain.is_recommending,
            moderation_state: domain.moderation_state,
            position: domain.position,
            owner_id: domain.owner_id,
            goal_id: domain.scope.goal_id(),
            organization_id: domain.scope.organization_id(),
            content: domain.content.iter().map(|blob| STANDARD.encode(blob)).collect(),
            created_at: domain.created_at.to_rfc3339(),
        }
    }

    pub fn to_dto_list(domain_stories: Vec<DomainStory>) -> Vec<Story> {
        domain_stories.into_iter().map(Self::to_dto).collect()
    }

    pub fn to_summary(domain: DomainStory) -> StorySummary {
        StorySummary {
            id: domain.id,
            description: domain.description,
            is_recommending: domain.is_recommending,
            owner_id: domain.owner_id,
        }
    }

    pub fn to_favorites(shelf: BTreeMap<u8, DomainStory>) -> FavoriteStoriesResponse {
        shelf
            .into_iter()
            .map(|(position, story)| (position, Self::to_summary(story)))
            .collect()
    }

    pub fn to_create_command(request: CreateStoryRequest) -> LoyaltyResult<CreateStoryCommand> {
        Ok(CreateStoryCommand {
            description: request.description,
            is_recommending: request.is_recommending,
            goal_id: request.goal_id,
            organization_id: request.organization_id,
            content: Self::decode_content(&request.content)?,
            code: request.code,
        })
    }

    pub fn to_update_command(request: UpdateStoryRequest) -> LoyaltyResult<UpdateStoryCommand> {
        Ok(UpdateStoryCommand {
            description: request.description,
            is_recommending: request.is_recommending,
            content: request
                .content
                .as_deref()
                .map(Self::decode_content)
                .transpose()?,
        })
    }

    fn decode_content(content: &[String]) -> LoyaltyResult<Vec<Vec<u8>>> {
        content
            .iter()
            .enumerate()
            .map(|(index, item)| {
                STANDARD.decode(item).map_err(|e| {
                    LoyaltyError::InvalidRequest(format!("content item {} is not valid base64: {}", index, e))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: Vec<&str>) -> CreateStoryRequest {
        CreateStoryRequest {
            description: "Nice".to_string(),
            is_recommending: true,
            goal_id: Some(42),
            organization_id: None,
            content: content.into_iter().map(String::from).collect(),
            code: None,
        }
    }

    #[test]
    fn content_is_decoded_from_base64() {
        let command = StoryMapper::to_create_command(request(vec!["aGVsbG8="])).unwrap();
        assert_eq!(command.content, vec![b"hello".to_vec()]);
    }

    #[test]
    fn malformed_content_is_an_invalid_request() {
        let result = StoryMapper::to_create_command(request(vec!["not base64!"]));
        assert!(matches!(result, Err(LoyaltyError::InvalidRequest(_))));
    }
}
