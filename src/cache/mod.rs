pub mod element_cache;
