pub mod ms {
    pub const POLL_INTERVAL: u64 = 250;
    pub const READY_STATE_POLL: u64 = 50;
    pub const READY_TIMEOUT: u64 = 30_000;
    pub const RETRY_DELAY: u64 = 2_000;
    pub const PAGE_SETTLE: u64 = 2_000;
    pub const INTERACTION_SETTLE: u64 = 2_000;
    pub const DETAIL_SETTLE: u64 = 2_000;
    pub const BACK_SETTLE: u64 = 2_000;
    pub const CONNECT_RETRY: u64 = 500;
}

pub mod secs {
    pub const NAVIGATION: u64 = 60;
    pub const READY_STATE: u64 = 5;
    pub const REQUEST: u64 = 120;
}

pub const NAVIGATION_ATTEMPTS: u32 = 3;
pub const MAX_PAGES: usize = 3;
