pub mod collection;
pub mod permissions;
pub mod record;

pub use collection::get as collection_get;
pub use collection::post as collection_post;

pub use record::delete as record_delete;
pub use record::get as record_get;
pub use record::patch as record_patch;

pub use permissions::delete as permissions_delete;
pub use permissions::get as permissions_get;
pub use permissions::post as permissions_post;
