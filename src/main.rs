use clap::Parser;
use deploy_scripts::{chain::setup_client, cli::Cli, errors::ScriptError};

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let Cli {
        priv_key,
        rpc_url,
        artifacts_dir,
        generated_dir,
        manifest_path,
        explorer_api_url,
        explorer_api_key,
        command,
    } = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    let client = setup_client(&priv_key, &rpc_url).await?;

    command
        .run(
            client,
            &artifacts_dir,
            &generated_dir,
            &manifest_path,
            explorer_api_url,
            explorer_api_key,
        )
        .await
}
