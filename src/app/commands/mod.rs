pub mod copy;
pub mod image;
pub mod init;
pub mod load;
pub mod lookup;
pub mod save;
