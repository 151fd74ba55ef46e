//! Page scrapers for supported content platforms.
//!
//! | Platform | Module | Method |
//! |----------|--------|--------|
//! | meipian | [`meipian`] | Embedded `ARTICLE_DETAIL` script variable |
//!
//! A scraper takes the raw page text and returns the raw article record as
//! JSON; interpreting that record is the job of [`crate::models`].

pub mod meipian;
