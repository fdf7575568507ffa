use serde::Deserialize;

// Query parameter struct for token
#[derive(Deserialize, Debug, Default)]
pub struct TokenQuery {
    pub token: Option<String>,
}
