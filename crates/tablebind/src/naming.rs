//! Deterministic name normalization.
//!
//! Every function here is pure: the same input always produces the same
//! output, and `normalize_name` is idempotent so already-normalized names
//! pass through unchanged. Generated model and accessor names all funnel
//! through this module so the rest of the crate never invents its own
//! casing rules.

use crate::schema::{ColumnDescriptor, SemanticType};

/// Render a raw identifier in canonical lower-snake form.
///
/// Camel boundaries are split, runs of non-alphanumeric characters collapse
/// to single underscores, and the result is lowercased and trimmed:
///
/// - `"Author ID"` → `"author_id"`
/// - `"HTTPServer"` → `"http_server"`
/// - `"author_id"` → `"author_id"` (idempotent)
pub fn normalize_name(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() {
            if c.is_uppercase() {
                let prev = i.checked_sub(1).map(|j| chars[j]);
                let next = chars.get(i + 1).copied();
                // Boundary before "aB" and before the last capital of "ABc".
                let boundary = match prev {
                    Some(p) if p.is_lowercase() || p.is_numeric() => true,
                    Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                    _ => false,
                };
                if boundary && !out.is_empty() && !out.ends_with('_') {
                    out.push('_');
                }
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Normalize a column name into its accessor alias.
///
/// Applies [`normalize_name`]; boolean columns additionally drop a leading
/// `is_` segment (`IsActive: bool` → `active`). Date and datetime columns
/// deliberately get no temporal-suffix rewrite.
pub fn normalize_column_name(column: &ColumnDescriptor) -> String {
    let name = normalize_name(&column.name);
    if column.semantic == SemanticType::Boolean {
        if let Some(stripped) = name.strip_prefix("is_") {
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    name
}

/// Irregular plural → singular forms the rule table cannot derive.
const IRREGULAR_SINGULARS: &[(&str, &str)] = &[
    ("people", "person"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("feet", "foot"),
    ("teeth", "tooth"),
];

/// Singularize the final underscore-separated segment of a normalized name.
///
/// `"authors"` → `"author"`, `"book_reviews"` → `"book_review"`,
/// `"categories"` → `"category"`. Already-singular names pass through,
/// including `-ss`/`-us`/`-is` endings (`address`, `status`, `analysis`).
pub fn singularize(name: &str) -> String {
    let (head, last) = match name.rfind('_') {
        Some(idx) => (&name[..=idx], &name[idx + 1..]),
        None => ("", name),
    };

    for (plural, singular) in IRREGULAR_SINGULARS {
        if last == *plural {
            return format!("{head}{singular}");
        }
    }

    let singular = if last.ends_with("ies") && last.len() > 4 {
        format!("{}y", &last[..last.len() - 3])
    } else if last.ends_with("ss") || last.ends_with("us") || last.ends_with("is") {
        last.to_string()
    } else if ["ses", "xes", "zes", "ches", "shes"]
        .iter()
        .any(|suffix| last.ends_with(suffix))
    {
        last[..last.len() - 2].to_string()
    } else if last.ends_with('s') && last.len() > 1 {
        last[..last.len() - 1].to_string()
    } else {
        last.to_string()
    };

    format!("{head}{singular}")
}

/// Derive the model identifier for a base table name: normalized,
/// singularized, rendered UpperCamelCase.
///
/// `"Authors"` → `"Author"`, `"book_reviews"` → `"BookReview"`.
pub fn model_name(base_name: &str) -> String {
    camelize(&singularize(&normalize_name(base_name)))
}

/// Render a lower-snake name in UpperCamelCase.
pub fn camelize(snake: &str) -> String {
    snake
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bool_column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor::new(name, "boolean")
    }

    #[test]
    fn test_normalize_name_basic() {
        assert_eq!(normalize_name("Author ID"), "author_id");
        assert_eq!(normalize_name("AuthorId"), "author_id");
        assert_eq!(normalize_name("AuthorID"), "author_id");
        assert_eq!(normalize_name("HTTPServer"), "http_server");
        assert_eq!(normalize_name("Publisher-Website"), "publisher_website");
        assert_eq!(normalize_name("a  b---c"), "a_b_c");
    }

    #[test]
    fn test_normalize_name_trims_edges() {
        assert_eq!(normalize_name("  padded  "), "padded");
        assert_eq!(normalize_name("__already__"), "already");
        assert_eq!(normalize_name("!!!"), "");
    }

    #[test]
    fn test_normalize_name_idempotent() {
        for raw in [
            "Author ID",
            "AuthorID",
            "HTTPServer",
            "already_normalized",
            "Col1Value",
            "  odd -- input ## 7",
        ] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_normalize_name_digit_boundaries() {
        assert_eq!(normalize_name("Col1Value"), "col1_value");
        assert_eq!(normalize_name("utf8String"), "utf8_string");
    }

    #[test]
    fn test_normalize_column_name_strips_boolean_is() {
        assert_eq!(normalize_column_name(&bool_column("IsActive")), "active");
        assert_eq!(normalize_column_name(&bool_column("is_admin")), "admin");
        // Nothing would remain: keep the normalized name.
        assert_eq!(normalize_column_name(&bool_column("is_")), "is");
        assert_eq!(normalize_column_name(&bool_column("Is")), "is");
    }

    #[test]
    fn test_normalize_column_name_non_boolean_keeps_is() {
        let col = ColumnDescriptor::new("IsbnCode", "varchar");
        assert_eq!(normalize_column_name(&col), "isbn_code");
        let col = ColumnDescriptor::new("is_active", "varchar");
        assert_eq!(normalize_column_name(&col), "is_active");
    }

    #[test]
    fn test_singularize_rules() {
        assert_eq!(singularize("authors"), "author");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("branches"), "branch");
        assert_eq!(singularize("address"), "address");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("analysis"), "analysis");
        assert_eq!(singularize("s"), "s");
    }

    #[test]
    fn test_singularize_irregulars_and_segments() {
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("sales_people"), "sales_person");
        assert_eq!(singularize("book_reviews"), "book_review");
    }

    #[test]
    fn test_model_name() {
        assert_eq!(model_name("Authors"), "Author");
        assert_eq!(model_name("Publishers"), "Publisher");
        assert_eq!(model_name("book_reviews"), "BookReview");
        assert_eq!(model_name("legacy users"), "LegacyUser");
        assert_eq!(model_name("Status"), "Status");
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("book_review"), "BookReview");
        assert_eq!(camelize("a"), "A");
        assert_eq!(camelize(""), "");
    }
}
