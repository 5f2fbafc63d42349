//! Minimal GL scalar type aliases, just enough to name the dispatch-table
//! function-pointer signatures. This crate does not provide a full GL
//! binding; it only calls the entry points §4.1-4.6 name.
#![allow(non_camel_case_types)]

pub type GLenum = u32;
pub type GLboolean = u8;
pub type GLbitfield = u32;
pub type GLint = i32;
pub type GLsizei = i32;
pub type GLuint = u32;
pub type GLfloat = f32;
pub type GLintptr = isize;
pub type GLsizeiptr = isize;
pub type GLchar = std::os::raw::c_char;
pub type GLvoid = std::os::raw::c_void;
