pub mod contact;
pub mod density;
