/// Microsoft Graph credentials, read once from the environment and passed
/// explicitly to whatever needs them. Empty variables count as unset.
#[derive(Debug, Clone, Default)]
pub struct GraphSettings {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub organizer_user_id: Option<String>,
    pub base_url: Option<String>,
}

impl GraphSettings {
    pub fn from_env() -> GraphSettings {
        GraphSettings {
            tenant_id: env_var("GRAPH_TENANT_ID"),
            client_id: env_var("GRAPH_CLIENT_ID"),
            client_secret: env_var("GRAPH_CLIENT_SECRET"),
            organizer_user_id: env_var("GRAPH_ORGANIZER_USER_ID"),
            base_url: env_var("GRAPH_BASE_URL"),
        }
    }

    /// All credentials needed to build real providers are present.
    /// The base URL is optional and defaults inside the Graph client.
    pub fn is_complete(&self) -> bool {
        self.tenant_id.is_some()
            && self.client_id.is_some()
            && self.client_secret.is_some()
            && self.organizer_user_id.is_some()
    }
}

fn env_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> GraphSettings {
        GraphSettings {
            tenant_id: Some("tenant".to_string()),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            organizer_user_id: Some("organizer@example.com".to_string()),
            base_url: None,
        }
    }

    #[test]
    fn complete_when_all_credentials_present() {
        assert!(filled().is_complete());
    }

    #[test]
    fn incomplete_without_organizer() {
        let mut settings = filled();
        settings.organizer_user_id = None;
        assert!(!settings.is_complete());
    }

    #[test]
    fn default_is_incomplete() {
        assert!(!GraphSettings::default().is_complete());
    }
}
