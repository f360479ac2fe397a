pub mod store_backed;
