#![deny(clippy::all, clippy::pedantic)]

use jsonfetch::{ConfigLayer, FetchClient, RequestConfig};
use serde_json::Value;

use crate::args::{BodyArgs, Commands};
use crate::client::CliError;
use crate::io::load_payload;

fn query_layer(query: Vec<(String, String)>) -> Option<ConfigLayer> {
    (!query.is_empty()).then(|| RequestConfig::new().with_query(query).into())
}

fn payload(args: &BodyArgs) -> Result<Option<Value>, CliError> {
    load_payload(args.data.as_deref(), args.data_file.as_deref())
}

pub async fn handle(client: &FetchClient, command: Commands) -> Result<Value, CliError> {
    let value = match command {
        Commands::Get(args) => {
            let layer = query_layer(args.query);
            client.get(&args.locator, layer.as_ref(), None).await?
        }
        Commands::Post(args) => {
            let body = payload(&args)?;
            let layer = query_layer(args.query);
            client
                .post(&args.locator, body.as_ref(), layer.as_ref(), None)
                .await?
        }
        Commands::Put(args) => {
            let body = payload(&args)?;
            let layer = query_layer(args.query);
            client
                .put(&args.locator, body.as_ref(), layer.as_ref(), None)
                .await?
        }
        Commands::Patch(args) => {
            let body = payload(&args)?;
            let layer = query_layer(args.query);
            client
                .patch(&args.locator, body.as_ref(), layer.as_ref(), None)
                .await?
        }
        Commands::Delete(args) => {
            let body = payload(&args)?;
            let layer = query_layer(args.query);
            client
                .delete(&args.locator, body.as_ref(), layer.as_ref(), None)
                .await?
        }
    };
    Ok(value)
}
