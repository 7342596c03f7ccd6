pub mod dump;
pub mod projection;
pub mod store;

pub use dump::{dump, DumpFilter};
pub use projection::{output_collection, output_record, strip_client_reserved};
pub use store::Store;
