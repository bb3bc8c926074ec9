use std::env::var;

use dotenvy::dotenv;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub provider_url: String,
}

impl Config {
    pub fn try_parse() -> Result<Config, &'static str> {
        let _ = dotenv();

        Ok(Config {
            port: var("PORT")
                .map_err(|_| "An error occured while getting PORT env param")?
                .parse::<u16>()
                .map_err(|_| "An error occured while parsing PORT env param")?,
            database_url: var("DATABASE_URL")
                .map_err(|_| "An error occured while getting DATABASE_URL env param")?,
            provider_url: var("PROVIDER_URL")
                .map_err(|_| "An error occured while getting PROVIDER_URL env param")?,
        })
    }
}
