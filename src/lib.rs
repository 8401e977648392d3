pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod lifecycle;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    ApprovalLevel, Currency, Deal, DealNumber, DealStatus, Decimal, GsecDeal, MoneyMarketDeal,
    Principal, ProductType, Role,
};
pub use error::AppError;
pub use lifecycle::{DealService, EodRunner};
