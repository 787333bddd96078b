pub mod offline_support;
