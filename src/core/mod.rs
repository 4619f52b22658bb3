// Core modules: byte cursor, size prefixes, typed decoders, row assembly, errors.
pub mod cursor;
pub mod decode;
pub mod error;
pub mod observe;
pub mod row;
pub mod schema;
pub mod size;
