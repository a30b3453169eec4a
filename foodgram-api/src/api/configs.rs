use rocket::{
    figment::Figment,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Config {
    pub api_key: Option<String>,
    /// Directory of the daily rolling log file, console only when unset
    pub log_dir: Option<String>,
    /// First line of the downloadable shopping list
    pub document_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            log_dir: None,
            document_title: "Foodgram".to_string(),
        }
    }
}

pub fn config_provider() -> Figment {
    use rocket::figment::providers::{Env, Serialized};

    rocket::figment::Figment::from(rocket::Config::default())
        .merge(Serialized::defaults(Config::default()))
        .merge(("databases.main", rocket_db_pools::Config::default()))
        .merge(Env::prefixed("FG_").global())
}

pub fn get_database_url() -> Result<String, rocket::figment::Error> {
    config_provider().extract_inner("databases.main.url")
}
