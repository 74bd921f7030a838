pub mod header;
pub mod share_bar;
