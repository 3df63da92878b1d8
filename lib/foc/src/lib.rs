#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

pub mod transforms;
pub mod svm;
pub mod pid;
pub mod cascade;
pub mod six_step;
pub mod drive;
pub mod foc;
