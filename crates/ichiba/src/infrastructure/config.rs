use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_create_database")]
    pub create_database: bool,
    #[serde(default = "default_secret")]
    pub secret: String,
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: ichiba_home().join("config.yml"),
            port: default_port(),
            database_path: default_database_path(),
            create_database: default_create_database(),
            secret: default_secret(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

fn ichiba_home() -> PathBuf {
    match std::env::var("ICHIBA_HOME") {
        Ok(path) => PathBuf::from(path),
        Err(_) => dirs::home_dir().expect("should have home").join(".ichiba"),
    }
}

fn default_port() -> u16 {
    3000
}

fn default_secret() -> String {
    let rng = rand::rng();
    rng.sample_iter(Alphanumeric).take(16).map(char::from).collect()
}

fn default_database_path() -> String {
    let path = ichiba_home();
    if !path.exists() {
        let _ = std::fs::create_dir_all(&path);
    }
    path.join("ichiba.db").display().to_string()
}

fn default_create_database() -> bool {
    true
}

fn default_token_ttl_seconds() -> i64 {
    86400
}

impl Config {
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Config, anyhow::Error> {
        let config_path = match path {
            Some(p) => PathBuf::new().join(p),
            None => ichiba_home().join("config.yml"),
        };

        match std::fs::File::open(config_path.clone()) {
            Ok(file) => {
                info!("Open config from {:?}", config_path);
                let mut cfg: Self = serde_yml::from_reader(file)?;
                cfg.path = config_path;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Config {
                    path: config_path,
                    ..Default::default()
                };
                cfg.save()?;
                info!("Write default config at {:?}", cfg.path);
                Ok(cfg)
            }
        }
    }

    pub fn save(&self) -> Result<(), anyhow::Error> {
        std::fs::write(&self.path, serde_yml::to_string(&self)?)?;

        Ok(())
    }
}
