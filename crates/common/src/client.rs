/// A long-lived client to an external service, built once at start-up and
/// cloned into every request handler.
#[async_trait::async_trait]
pub trait ModuleClient: Clone + Send + Sync + 'static {
    const NAME: &'static str;
    const ENV_VARS: &'static [&'static str];
    type Client;

    fn validate_env() -> bool {
        let missing_vars: Vec<&'static str> = Self::ENV_VARS
            .iter()
            .cloned()
            .filter(|var| std::env::var(var).is_err())
            .collect();

        if missing_vars.is_empty() {
            return true;
        }

        tracing::error!(
            "[Client: {}] Required environment variables are not set: [{}]",
            Self::NAME,
            missing_vars.join(", ")
        );
        false
    }

    async fn setup_connection() -> anyhow::Result<Self>;

    fn get_client(&self) -> &Self::Client;
}
