pub mod blame;
pub mod cache;
pub mod checkout;
pub mod diff;
pub mod history;
pub mod repository;

pub use blame::{BlameIndex, FileBlame};
pub use cache::{HistoryCache, LruHistoryCache, NoopHistoryCache};
pub use checkout::ScratchCheckout;
pub use history::FileHistoryLookup;
pub use repository::GitRepository;
