use anyhow::{ensure, Result};

use thebestory_common::{try_load, EnvVars};
use thebestory_content::{Listing, ANONYMOUS_USER_ID};

pub struct ApiServerEnv {
    pub port: u16,
    pub create_tables: bool,
    pub anonymous_user_id: i64,
    pub listing: Listing,
}

impl EnvVars for ApiServerEnv {
    fn load() -> Result<Self> {
        let listing = Listing::new(
            try_load("LISTING_MIN_LIMIT", 1)?,
            try_load("LISTING_MAX_LIMIT", 100)?,
            try_load("LISTING_DEFAULT_LIMIT", 25)?,
        );
        ensure!(
            1 <= listing.min_limit
                && listing.min_limit <= listing.default_limit
                && listing.default_limit <= listing.max_limit,
            "listing limits must satisfy 1 <= min <= default <= max, got {listing:?}"
        );

        Ok(Self {
            port: try_load("PORT", 3033)?,
            create_tables: try_load("CREATE_TABLES", false)?,
            anonymous_user_id: try_load("ANONYMOUS_USER_ID", ANONYMOUS_USER_ID)?,
            listing,
        })
    }
}
