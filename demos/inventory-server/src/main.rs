use stockpulse::prelude::*;
use tracing_subscriber::EnvFilter;

/// Accounts used when `STOCKPULSE_ACCOUNTS` is not set.
const DEMO_ACCOUNTS: &str = "admin:admin:Admin";

/// Parses `username:password[:first name]` entries separated by commas.
fn parse_accounts(spec: &str) -> StaticCredentials {
    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let username = parts.next().filter(|u| !u.is_empty())?;
            let password = parts.next()?;
            let identity = match parts.next().filter(|f| !f.is_empty()) {
                Some(first_name) => Identity::new(username).with_first_name(first_name),
                None => Identity::new(username),
            };
            Some((identity, password.to_string()))
        })
        .fold(StaticCredentials::new(), |accounts, (identity, password)| {
            accounts.with_account(identity, password)
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stockpulse=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    let config = ServerConfig::from_env();
    let accounts_spec =
        std::env::var("STOCKPULSE_ACCOUNTS").unwrap_or_else(|_| DEMO_ACCOUNTS.to_string());
    let accounts = parse_accounts(&accounts_spec);
    if accounts.is_empty() {
        return Err("STOCKPULSE_ACCOUNTS contains no valid accounts".into());
    }

    let server = StockpulseServerBuilder::with_config(config)
        .build(accounts, MemoryInventory::new())
        .await?;

    tracing::info!(
        http = %server.local_addr()?,
        realtime = %server.realtime_addr()?,
        "inventory server listening"
    );

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_accounts_reads_all_entries() {
        let accounts = parse_accounts("ada:pw1:Ada, bob:pw2");
        assert_eq!(accounts.len(), 2);

        let ada = accounts.verify("ada", "pw1").await.unwrap();
        assert_eq!(ada.display_name(), "Ada");
        let bob = accounts.verify("bob", "pw2").await.unwrap();
        assert_eq!(bob.display_name(), "bob");
    }

    #[test]
    fn test_parse_accounts_skips_malformed_entries() {
        let accounts = parse_accounts("nopassword, :pw, ,carol:pw");
        assert_eq!(accounts.len(), 1);
    }

    #[test]
    fn test_parse_accounts_password_may_be_empty() {
        assert_eq!(parse_accounts("dev:").len(), 1);
    }

    #[tokio::test]
    async fn test_demo_accounts_allow_admin_login() {
        let accounts = parse_accounts(DEMO_ACCOUNTS);
        assert!(accounts.verify("admin", "admin").await.is_ok());
    }
}
