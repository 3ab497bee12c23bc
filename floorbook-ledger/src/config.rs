use floorbook_api::MAX_BODY_LEN;

#[derive(Clone, Debug, structopt::StructOpt)]
pub struct LedgerConfig {
    /// How many times a taken floor number is recomputed before giving up
    #[structopt(long, default_value = "5")]
    pub max_floor_retries: u32,

    /// Maximum number of characters in a comment body
    #[structopt(long, default_value = "1000")]
    pub max_body_len: usize,
}

impl Default for LedgerConfig {
    fn default() -> LedgerConfig {
        LedgerConfig {
            max_floor_retries: 5,
            max_body_len: MAX_BODY_LEN,
        }
    }
}
