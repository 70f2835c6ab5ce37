pub mod assets;
pub mod callback;
pub mod health;
pub mod home;
pub mod login;
pub mod logout;
pub mod root;
