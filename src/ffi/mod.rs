pub mod function_table;
pub mod magick_wand_sys;

#[cfg(test)]
pub(crate) mod fake;
