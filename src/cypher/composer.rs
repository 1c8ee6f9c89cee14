//! Query composer.
//!
//! Chains a seed and property fragments into one statement yielding a row
//! per entity and a column per property. Fragments are placed in dependency
//! order: a fragment runs only after something has bound its input.

use std::collections::BTreeSet;

use tracing::trace;

use crate::model::relationship::check_identifier;
use super::{ComposedQuery, Filter, PropertyFragment, QueryKind, Seed, COUNT_COLUMN};
use crate::model::{PropertyMap, Value};
use crate::{Error, Result};

/// Builder for one resource family's statements.
#[derive(Debug, Clone)]
pub struct QueryComposer {
    seed: Seed,
    fragments: Vec<PropertyFragment>,
    filters: Vec<Filter>,
    returns: Vec<String>,
    order_by: Option<String>,
    key: Option<String>,
}

impl QueryComposer {
    pub fn new(seed: Seed) -> Self {
        Self {
            seed,
            fragments: Vec::new(),
            filters: Vec::new(),
            returns: Vec::new(),
            order_by: None,
            key: None,
        }
    }

    /// Swap the seed, keeping fragments and filters. Used when the seed
    /// depends on the request.
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    pub fn fragment(mut self, fragment: PropertyFragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    pub fn fragments<I: IntoIterator<Item = PropertyFragment>>(mut self, fragments: I) -> Self {
        self.fragments.extend(fragments);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters<I: IntoIterator<Item = Filter>>(mut self, filters: I) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Columns of the final `RETURN`, in order. Defaults to every bound
    /// variable except the correlation variable.
    pub fn returns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Display column for `ORDER BY toLower(..)`. Defaults to the seed's
    /// display term.
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by = Some(column.to_owned());
        self
    }

    /// Natural key: the count distincts on it and it breaks ordering ties.
    /// Defaults to the correlation variable. An explicit key is added to
    /// the returned columns when missing.
    pub fn natural_key(mut self, column: &str) -> Self {
        self.key = Some(column.to_owned());
        self
    }

    pub fn correlation_variable(&self) -> &str {
        self.seed.correlation()
    }

    /// All matching rows.
    pub fn build(&self) -> Result<ComposedQuery> {
        self.compose(QueryKind::Rows, None)
    }

    /// `count(DISTINCT key)` with the same filters as [`build`](Self::build).
    pub fn build_count(&self) -> Result<ComposedQuery> {
        self.compose(QueryKind::Count, None)
    }

    /// One page of rows: `SKIP $skip LIMIT $limit`.
    pub fn build_page(&self, skip: u64, limit: u64) -> Result<ComposedQuery> {
        self.compose(QueryKind::Page, Some((skip, limit)))
    }

    fn display(&self) -> Result<String> {
        match &self.order_by {
            Some(c) => Ok(c.clone()),
            None => self
                .seed
                .display()
                .map(str::to_owned)
                .ok_or_else(|| Error::Configuration("no display column to order by".into())),
        }
    }

    fn key(&self) -> String {
        self.key.clone().unwrap_or_else(|| self.seed.correlation().to_owned())
    }

    /// Sorted, deduplicated filters.
    fn normalized_filters(&self) -> Vec<&Filter> {
        let mut filters: Vec<(String, &Filter)> =
            self.filters.iter().map(|f| (f.sort_key(), f)).collect();
        filters.sort_by(|a, b| a.0.cmp(&b.0));
        filters.dedup_by(|a, b| a.0 == b.0);
        filters.into_iter().map(|(_, f)| f).collect()
    }

    /// Place fragments so each input is bound before use. Declared order is
    /// kept wherever dependencies allow.
    fn ordered(&self, bound: &mut Vec<String>) -> Result<Vec<&PropertyFragment>> {
        for f in &self.fragments {
            if bound.iter().any(|b| b == f.alias())
                || self.fragments.iter().filter(|g| g.alias() == f.alias()).count() > 1
            {
                return Err(Error::Configuration(format!("alias '{}' bound twice", f.alias())));
            }
        }

        let mut pending: Vec<&PropertyFragment> = self.fragments.iter().collect();
        let mut placed = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let Some(pos) = pending.iter().position(|f| bound.iter().any(|b| b == f.input())) else {
                let stuck = pending[0];
                let produced_later = pending.iter().any(|g| g.alias() == stuck.input());
                return Err(Error::Configuration(if produced_later {
                    format!("fragments around '{}' depend on each other", stuck.alias())
                } else {
                    format!("fragment '{}' needs '{}' which nothing binds", stuck.alias(), stuck.input())
                }));
            };
            let f = pending.remove(pos);
            bound.push(f.alias().to_owned());
            placed.push(f);
        }
        Ok(placed)
    }

    /// Keep only fragments whose alias is in `needed`, plus what they
    /// consume.
    fn prune<'a>(placed: Vec<&'a PropertyFragment>, mut needed: BTreeSet<&'a str>) -> Vec<&'a PropertyFragment> {
        let mut keep = vec![false; placed.len()];
        for (i, f) in placed.iter().enumerate().rev() {
            if needed.contains(f.alias()) {
                keep[i] = true;
                needed.insert(f.input());
            }
        }
        placed
            .into_iter()
            .zip(keep)
            .filter_map(|(f, k)| k.then_some(f))
            .collect()
    }

    fn compose(&self, kind: QueryKind, window: Option<(u64, u64)>) -> Result<ComposedQuery> {
        let (seed_text, mut params) = self.seed.render()?;
        let mut bound: Vec<String> = self.seed.outputs().into_iter().map(str::to_owned).collect();
        let seed_bound = bound.clone();
        let placed = self.ordered(&mut bound)?;

        let display = self.display()?;
        let key = self.key();
        let filters = self.normalized_filters();

        let is_bound = |c: &str| bound.iter().any(|b| b == c);
        for c in [display.as_str(), key.as_str()] {
            if !is_bound(c) {
                return Err(Error::Configuration(format!("order column '{c}' is never bound")));
            }
        }
        for c in filters.iter().flat_map(|f| f.columns()) {
            if !is_bound(c) {
                return Err(Error::Configuration(format!("filter column '{c}' is never bound")));
            }
        }
        let mut returns: Vec<String> = if self.returns.is_empty() {
            bound.iter().filter(|b| *b != self.seed.correlation()).cloned().collect()
        } else {
            self.returns.clone()
        };
        // Rows are deduplicated on an explicit natural key, so it is always returned.
        if self.key.is_some() && !returns.contains(&key) {
            returns.push(key.clone());
        }
        for c in &returns {
            check_identifier("return column", c)?;
            if !is_bound(c) {
                return Err(Error::Configuration(format!("return column '{c}' is never bound")));
            }
        }

        // A count only needs what its filters and key read. Rows also need
        // what they return and order by.
        let mut needed: BTreeSet<&str> = filters.iter().flat_map(|f| f.columns()).collect();
        needed.insert(&key);
        if kind != QueryKind::Count {
            needed.insert(&display);
            needed.extend(returns.iter().map(String::as_str));
        }
        let used = Self::prune(placed, needed);

        let mut lines = vec![seed_text];
        let mut in_scope = seed_bound;
        for f in &used {
            let (text, fparams) = f.render()?;
            merge(&mut params, fparams)?;
            lines.push(text);
            in_scope.push(f.alias().to_owned());
        }

        if !filters.is_empty() {
            let mut preds = Vec::with_capacity(filters.len());
            for (i, f) in filters.iter().enumerate() {
                let name = format!("filter_{i}");
                preds.push(f.render(&name));
                merge(&mut params, [(name, f.param_value())].into_iter().collect())?;
            }
            lines.push(format!("WITH {} WHERE {}", in_scope.join(", "), preds.join(" AND ")));
        }

        let columns = match kind {
            QueryKind::Count => {
                lines.push(format!("RETURN count(DISTINCT {key}) AS {COUNT_COLUMN}"));
                vec![COUNT_COLUMN.to_owned()]
            }
            QueryKind::Rows | QueryKind::Page => {
                let tie = if key == display { String::new() } else { format!(", {key}") };
                lines.push(format!("RETURN {} ORDER BY toLower({display}){tie}", returns.join(", ")));
                if let Some((skip, limit)) = window {
                    lines.push("SKIP $skip LIMIT $limit".into());
                    merge(
                        &mut params,
                        [("skip".to_owned(), Value::from(skip)), ("limit".to_owned(), Value::from(limit))]
                            .into_iter()
                            .collect(),
                    )?;
                }
                returns
            }
        };

        let query = ComposedQuery {
            text: lines.join("\n"),
            params,
            columns,
            correlation_variable: self.seed.correlation().to_owned(),
            kind,
        };
        trace!(kind = ?query.kind, columns = ?query.columns, "composed query");
        Ok(query)
    }
}

fn merge(into: &mut PropertyMap, from: PropertyMap) -> Result<()> {
    for (k, v) in from {
        if into.contains_key(&k) {
            return Err(Error::Configuration(format!("parameter '{k}' bound twice")));
        }
        into.insert(k, v);
    }
    Ok(())
}
