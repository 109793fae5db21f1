//! Integration tests driving the compiled `postrel` binary

mod helpers;
mod test_release;
mod test_render;
