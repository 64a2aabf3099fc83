pub mod http_rates;
pub mod util;
