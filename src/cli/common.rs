use std::{
    env::{self, VarError},
    ffi::OsStr,
    fmt::Display,
    path::PathBuf,
    sync::Arc,
};

use clap::builder::styling::AnsiColor;
use log::debug;

use crate::{
    config::{Config, ENV_VAR_CONFIG},
    error::{Error, Result},
    format::format_path,
    remote::{HttpExecutor, RemoteClient},
};

use super::args::GlobalArgs;

pub fn config_path(args: &GlobalArgs) -> Result<PathBuf> {
    if let Some(path) = &args.config {
        return Ok(path.clone());
    }

    match get_env_var(ENV_VAR_CONFIG)? {
        Some(path) => Ok(PathBuf::from(path)),
        None => Config::default_path(),
    }
}

pub fn load_config(args: &GlobalArgs) -> Result<Config> {
    let path = config_path(args)?;
    debug!("using config {}", format_path(&path));
    Config::load_or_init(&path)
}

pub fn create_client(config: &Config) -> Result<RemoteClient> {
    let executor = HttpExecutor::new(config.credentials(), config.retry_policy())?;
    Ok(RemoteClient::new(
        Arc::new(executor),
        &config.remote.api_url,
        &config.remote.upload_url,
    ))
}

pub fn print_stat<T: Display>(name: &str, value: T) {
    let style = AnsiColor::BrightCyan.on_default();
    println!("{style}{name}:{style:#} {value}");
}

fn get_env_var<T: AsRef<OsStr>>(name: T) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(Error::other(err)),
    }
}
