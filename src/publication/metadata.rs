/// Upload metadata and its limits
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Client-supplied metadata for a new content item
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContentMetadata {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,

    #[serde(default)]
    #[validate(length(max = 20), custom(function = "validate_tags"))]
    pub tags: Vec<String>,
}

#[allow(clippy::ptr_arg)]
fn validate_tags(tags: &Vec<String>) -> Result<(), ValidationError> {
    let well_formed = tags
        .iter()
        .all(|tag| (1..=50).contains(&tag.chars().count()));

    if !well_formed {
        return Err(ValidationError::new("tag_length"));
    }

    Ok(())
}
