//! Listing and search parameters as a backend-neutral query.

use shelf_db::{DbError, Filter};

use super::models::BookFilters;

/// One filter parameter after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatch {
    Exact(String),
    /// Comma-separated list: the field must equal one of these.
    AnyOf(Vec<String>),
}

impl FieldMatch {
    /// `None` for an absent or empty parameter.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let raw = raw.filter(|value| !value.is_empty())?;

        if raw.contains(',') {
            let values = raw
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect();
            Some(FieldMatch::AnyOf(values))
        } else {
            Some(FieldMatch::Exact(raw.to_string()))
        }
    }

    pub fn to_filter(&self, field: &str) -> Filter {
        match self {
            FieldMatch::Exact(value) => Filter::eq(field, value.as_str()),
            FieldMatch::AnyOf(values) => Filter::any_of(field, values.iter().map(String::as_str)),
        }
    }
}

/// Which books a listing or search selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookQuery {
    /// `GET /books`: every present parameter must match.
    Listing {
        author: Option<FieldMatch>,
        genre: Option<FieldMatch>,
    },
    /// `GET /search`: case-insensitive substring of title or author.
    Search(String),
}

impl BookQuery {
    pub fn listing(filters: &BookFilters) -> Self {
        BookQuery::Listing {
            author: FieldMatch::parse(filters.author.as_deref()),
            genre: FieldMatch::parse(filters.genre.as_deref()),
        }
    }

    pub fn search(text: &str) -> Self {
        BookQuery::Search(text.to_string())
    }

    /// Document-store form of the query.
    pub fn to_filter(&self) -> Result<Filter, DbError> {
        match self {
            BookQuery::Listing { author, genre } => {
                let constraints = [("author", author), ("genre", genre)]
                    .into_iter()
                    .filter_map(|(field, matcher)| {
                        matcher.as_ref().map(|matcher| matcher.to_filter(field))
                    })
                    .collect();
                Ok(Filter::all_of(constraints))
            }
            BookQuery::Search(text) => Ok(Filter::Or(vec![
                Filter::contains_ignore_case("title", text)?,
                Filter::contains_ignore_case("author", text)?,
            ])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use shelf_db::Document;

    fn book(author: &str, genre: &str, title: &str) -> Document {
        match json!({"author": author, "genre": genre, "title": title}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn filters(author: Option<&str>, genre: Option<&str>) -> BookFilters {
        BookFilters {
            author: author.map(str::to_string),
            genre: genre.map(str::to_string),
        }
    }

    #[test]
    fn comma_list_is_trimmed_any_of() {
        assert_eq!(
            FieldMatch::parse(Some("Le Guin, Herbert ,")),
            Some(FieldMatch::AnyOf(vec!["Le Guin".into(), "Herbert".into()]))
        );
    }

    #[test]
    fn single_value_is_exact_and_untrimmed() {
        assert_eq!(
            FieldMatch::parse(Some(" Herbert")),
            Some(FieldMatch::Exact(" Herbert".into()))
        );
        assert_eq!(FieldMatch::parse(Some("")), None);
        assert_eq!(FieldMatch::parse(None), None);
    }

    fn listing_filter(filters: &BookFilters) -> Filter {
        BookQuery::listing(filters).to_filter().unwrap()
    }

    #[test]
    fn author_list_matches_exactly_the_named_authors() {
        let filter = listing_filter(&filters(Some("A, B"), None));

        assert!(filter.matches(&book("A", "g", "t")));
        assert!(filter.matches(&book("B", "g", "t")));
        assert!(!filter.matches(&book("C", "g", "t")));
        assert!(!filter.matches(&book("AB", "g", "t")));
    }

    #[test]
    fn author_and_genre_combine() {
        let filter = listing_filter(&filters(Some("A"), Some("sf,fantasy")));

        assert!(filter.matches(&book("A", "fantasy", "t")));
        assert!(!filter.matches(&book("A", "horror", "t")));
        assert!(!filter.matches(&book("B", "sf", "t")));
    }

    #[test]
    fn empty_list_matches_nothing() {
        let filter = listing_filter(&filters(Some(" , "), None));
        assert!(!filter.matches(&book("A", "g", "t")));
    }

    #[test]
    fn no_filters_match_everything() {
        assert!(matches!(listing_filter(&BookFilters::default()), Filter::All));
    }

    #[test]
    fn search_hits_title_or_author_ignoring_case() {
        let filter = BookQuery::search("herb").to_filter().unwrap();

        assert!(filter.matches(&book("Frank Herbert", "sf", "Dune")));
        assert!(filter.matches(&book("X", "cooking", "Herbs & Spices")));
        assert!(!filter.matches(&book("Ursula Le Guin", "herbal", "Earthsea")));
    }
}
