use dotenvy::dotenv;
use std::env;

pub struct Config {
    pub db_max_connections: u32,
    pub min_password_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_max_connections: 5,
            min_password_length: 8,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let db_max_connections = match env::var("ORDERMILL_DB_MAX_CONNECTIONS") {
            Ok(val) => val.parse::<u32>().unwrap_or(5).clamp(1, 64),
            Err(_) => 5,
        };

        let min_password_length = match env::var("ORDERMILL_MIN_PASSWORD_LENGTH") {
            Ok(val) => val.parse::<usize>().unwrap_or(8).clamp(8, 128),
            Err(_) => 8,
        };

        Self {
            db_max_connections,
            min_password_length,
        }
    }
}
