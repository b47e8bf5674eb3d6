//! UIコンポーネントモジュール

pub mod loading;
pub mod nav_bar;
pub mod product_card;

pub use loading::{ErrorMessage, Loading};
pub use nav_bar::NavBar;
pub use product_card::{flash, ProductCard};
