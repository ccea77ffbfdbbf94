use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "dietplan".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "dietplan-professionals".into()),
        };
        Ok(Self { database_url, jwt })
    }
}

/// Where the authoring client finds the plans backend.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: var("DIETPLAN_API_URL")
                .unwrap_or_else(|| "http://localhost:8080/api/v1".into()),
            token: var("DIETPLAN_API_TOKEN").filter(|t| !t.is_empty()),
            timeout_secs: var("DIETPLAN_API_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15),
        }
    }
}
