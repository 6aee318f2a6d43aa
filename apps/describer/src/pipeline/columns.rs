//! Column names the pipeline reads or writes.

pub const ARTICLECODE: &str = "ARTICLECODE";
pub const GROUPNAME: &str = "GROUPNAME";
pub const TITLE: &str = "TITLE";
pub const SHORTDESCRIPTION: &str = "SHORTDESCRIPTION";
pub const KEY_SELLING_POINTS: &str = "KEY_SELLING_POINTS";

pub const ATTRIBUTENAME: &str = "ATTRIBUTENAME";
pub const VALUE: &str = "VALUE";

/// Target text of an example row. Never part of an example's input.
pub const LONGDESCRIPTION: &str = "LONGDESCRIPTION";
/// Language tag of an example row. Never part of an example's input.
pub const LANGUAGE: &str = "language";

pub const PRODUCT_COLUMNS: &[&str] = &[
    ARTICLECODE,
    GROUPNAME,
    TITLE,
    SHORTDESCRIPTION,
    KEY_SELLING_POINTS,
];

pub const ATTRIBUTE_COLUMNS: &[&str] = &[ARTICLECODE, ATTRIBUTENAME, VALUE];

pub const EXAMPLE_ONLY_COLUMNS: &[&str] = &[LONGDESCRIPTION, LANGUAGE];
