//! Identifier extraction from exchange URLs
//!
//! Metadata, pre-tile and bookmark URLs carry the document (and page) in the
//! query string; tile URLs carry them as the last two path segments:
//!
//! ```text
//! /api/v7/read/initread?bid=3238891
//! /deep/page/once/get?bid=3238891&pnum=3&k=<token>
//! /deep/page/lmg/3238891/3?k=<token>
//! ```

use std::borrow::Cow;
use std::str::FromStr;

use super::error::{ExchangeError, ExchangeResult};
use crate::types::{DocumentId, PageIndex};

/// First value of `name` in the URL query, percent-decoded
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);

    query
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .map(Cow::into_owned)
                .ok()
        })
}

fn required_param(url: &str, name: &'static str) -> ExchangeResult<String> {
    query_param(url, name).ok_or(ExchangeError::MissingParam(name))
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> ExchangeResult<T> {
    value.trim().parse().map_err(|_| ExchangeError::InvalidParam {
        name,
        value: value.to_string(),
    })
}

/// Path of the URL without scheme, host, query or fragment
fn url_path(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |at| &rest[at..]),
        None => without_query,
    }
}

/// Exchange scoped to a whole document (metadata, bookmark)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentParams {
    pub document_id: DocumentId,
}

impl DocumentParams {
    pub fn from_query(url: &str) -> ExchangeResult<Self> {
        let bid = required_param(url, "bid")?;
        Ok(Self {
            document_id: parse_number("bid", &bid)?,
        })
    }
}

/// Exchange scoped to one page and carrying a token (pre-tile, tile)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub document_id: DocumentId,
    pub page_index: PageIndex,
    pub token: String,
}

impl PageParams {
    /// `?bid=<document>&pnum=<page>&k=<token>`
    pub fn from_query(url: &str) -> ExchangeResult<Self> {
        let bid = required_param(url, "bid")?;
        let pnum = required_param(url, "pnum")?;
        Ok(Self {
            document_id: parse_number("bid", &bid)?,
            page_index: parse_number("pnum", &pnum)?,
            token: required_param(url, "k")?,
        })
    }

    /// `.../<document>/<page>?k=<token>`
    pub fn from_path(url: &str) -> ExchangeResult<Self> {
        let mut segments = url_path(url).rsplit('/').filter(|s| !s.is_empty());
        let (Some(page), Some(document)) = (segments.next(), segments.next()) else {
            return Err(ExchangeError::MissingPathSegment(url.to_string()));
        };

        Ok(Self {
            document_id: parse_number("bid", document)?,
            page_index: parse_number("pnum", page)?,
            token: required_param(url, "k")?,
        })
    }
}
