#![feature(const_type_name)]
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

#[cfg(feature = "alloc")]
extern crate alloc;

// Erased pointer utilities
mod ptr;
pub use ptr::*;

// TypeId equivalent usable in const contexts
mod const_typeid;
pub use const_typeid::*;

// Per-type descriptors
mod type_info;
pub use type_info::*;
