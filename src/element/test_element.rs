//! Test element resolution and actions
//!
//! A [`TestElement`] resolves a [`SearchedElement`] against the engine of a
//! channel, parent first, and then runs actions against the selected handle.
//! Every action reports into a caller-owned [`ActionStatus`]; transient
//! backend failures are absorbed by the retry loops and only their final
//! outcome reaches the status.

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::channel::instance::Channel;
use crate::element::found::FoundElement;
use crate::element::occurrences::{Comparison, Occurrences};
use crate::element::property::{CalculatedProperty, CalculatedValue, Criteria};
use crate::element::retry::RetryPolicy;
use crate::element::searched::SearchedElement;
use crate::engine::traits::{DriverEngine, ElementQuery};
use crate::engine::types::{MouseDirection, SendKeyData};
use crate::report::{ActionStatus, ElementSummary, StatusCode};
use crate::Error;

pub const ATS_OCCURRENCES: &str = "-ats-occurences";
pub const ATS_OCCURRENCES_INDEX: &str = "-ats-occurences-index";
pub const ATS_TABLE_DATA: &str = "-ats-table-data";
pub const ATS_MAX_TRY: &str = "-ats-max-try";
pub const ATS_SEARCH_DURATION: &str = "-ats-search-duration";
pub const ATS_SEARCH_TAG: &str = "-ats-search-tag";

const MASKED_TEXT: &str = "########";
const KEY_PREFIX: &str = "$key";
const TRY_SEARCH: i32 = 3;

/// One cell of extracted text data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub index: usize,
    pub name: String,
    pub value: String,
}

impl Parameter {
    /// Positional cell, named after its column
    pub fn new<S: Into<String>>(index: usize, value: S) -> Self {
        Self {
            index,
            name: index.to_string(),
            value: value.into(),
        }
    }

    pub fn named<N: Into<String>, S: Into<String>>(index: usize, name: N, value: S) -> Self {
        Self {
            index,
            name: name.into(),
            value: value.into(),
        }
    }
}

fn empty_row() -> Vec<Parameter> {
    vec![Parameter::new(0, "")]
}

/// Resolution state of one query bound to a channel
#[derive(Debug)]
pub struct TestElement {
    channel: Arc<Channel>,
    parent: Option<Box<TestElement>>,
    found_elements: Vec<FoundElement>,
    count: usize,
    index: usize,
    occurrences: Occurrences,
    max_try: u32,
    max_try_interactable: u32,
    search_duration: Duration,
    total_search_duration: Duration,
    criterias: String,
    searched_tag: String,
    sys_comp: bool,
}

impl TestElement {
    fn unresolved(channel: Arc<Channel>, max_try: u32, occurrences: Occurrences, index: usize) -> Self {
        let max_try_interactable = channel.timing().max_try_interactable;
        Self {
            channel,
            parent: None,
            found_elements: Vec::new(),
            count: 0,
            index,
            occurrences,
            max_try,
            max_try_interactable,
            search_duration: Duration::ZERO,
            total_search_duration: Duration::ZERO,
            criterias: String::new(),
            searched_tag: String::new(),
            sys_comp: false,
        }
    }

    /// Resolve `searched` with the channel's retry budget and the default
    /// "at least one" occurrence predicate
    pub async fn find(channel: Arc<Channel>, searched: &SearchedElement) -> Self {
        let max_try = channel.timing().max_try;
        Self::resolve(channel, max_try, Occurrences::at_least_one(), searched).await
    }

    /// Resolve `searched`, parent chain first; each level uses the same
    /// budget and occurrence predicate
    #[instrument(skip_all, fields(tag = %searched.tag, depth = searched.depth()))]
    pub async fn resolve(
        channel: Arc<Channel>,
        max_try: u32,
        occurrences: Occurrences,
        searched: &SearchedElement,
    ) -> Self {
        let mut chain = Vec::new();
        let mut current = searched.parent.as_deref();
        while let Some(query) = current {
            chain.push(query);
            current = query.parent.as_deref();
        }

        let mut parent: Option<Box<TestElement>> = None;
        for query in chain.into_iter().rev() {
            let mut element =
                Self::unresolved(channel.clone(), max_try, occurrences.clone(), query.index);
            element.parent = parent.take();
            element.start_search(query).await;
            parent = Some(Box::new(element));
        }

        let mut element = Self::unresolved(channel, max_try, occurrences, searched.index);
        element.parent = parent;
        element.start_search(searched).await;
        element
    }

    /// Wrap an element that is already resolved
    pub fn from_found(channel: Arc<Channel>, element: FoundElement) -> Self {
        let max_try = channel.timing().max_try;
        let mut test_element = Self::unresolved(channel, max_try, Occurrences::any(), 0);
        test_element.searched_tag = element.tag.clone();
        test_element.criterias = element.tag.clone();
        test_element.found_elements.push(element);
        test_element.count = test_element.elements_count();
        test_element
    }

    async fn start_search(&mut self, query: &SearchedElement) {
        self.sys_comp = query.sys_comp;
        self.searched_tag = query.tag.clone();
        self.criterias = query.description();

        let start = Instant::now();

        let parent_empty = self.parent.as_ref().map(|p| p.count == 0).unwrap_or(false);
        self.found_elements = if parent_empty {
            debug!("Parent resolved to nothing, search skipped");
            Vec::new()
        } else {
            self.load_elements(query).await
        };

        self.search_duration = start.elapsed();
        self.total_search_duration = self.search_duration
            + self
                .parent
                .as_ref()
                .map(|p| p.total_search_duration)
                .unwrap_or_default();
        self.count = self.elements_count();

        debug!(
            count = self.count,
            duration_ms = self.search_duration.as_millis() as u64,
            "Search [{}] done",
            self.criterias
        );
    }

    async fn load_elements(&self, query: &SearchedElement) -> Vec<FoundElement> {
        let engine = self.channel.engine();
        let parent = self.parent.as_ref().and_then(|p| p.found_element());

        let result = match &query.image {
            Some(template) => engine.find_elements_by_image(parent, template).await,
            None => {
                let attributes: Vec<String> = query.criteria.iter().map(|p| p.name.clone()).collect();
                let attribute_values: Vec<String> =
                    query.criteria.iter().map(CalculatedProperty::value_hint).collect();
                let predicate = Criteria::compile(&query.criteria);

                engine
                    .find_elements(&ElementQuery {
                        sys_comp: self.sys_comp,
                        parent,
                        tag: &query.tag,
                        attributes: &attributes,
                        attribute_values: &attribute_values,
                        predicate: &predicate,
                    })
                    .await
            }
        };

        match result {
            Ok(elements) => elements,
            Err(e) if e.is_stale() => {
                debug!("Stale reference during search: {}", e);
                Vec::new()
            }
            Err(e) => {
                warn!("Search [{}] failed: {}", self.criterias, e);
                Vec::new()
            }
        }
    }

    fn start_one_index(&self) -> usize {
        self.index.saturating_sub(1)
    }

    fn elements_count(&self) -> usize {
        if self.found_elements.len() > self.start_one_index() {
            self.found_elements.len()
        } else {
            0
        }
    }

    fn engine(&self) -> Arc<dyn DriverEngine> {
        self.channel.engine().clone()
    }

    // Accessors

    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    pub fn parent(&self) -> Option<&TestElement> {
        self.parent.as_deref()
    }

    pub fn found_elements(&self) -> &[FoundElement] {
        &self.found_elements
    }

    /// Element selected by the index, `None` when out of range
    pub fn found_element(&self) -> Option<&FoundElement> {
        self.found_elements.get(self.start_one_index())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn max_try(&self) -> u32 {
        self.max_try
    }

    pub fn set_max_try_interactable(&mut self, max_try: u32) {
        self.max_try_interactable = max_try;
    }

    pub fn search_duration(&self) -> Duration {
        self.search_duration
    }

    /// Own search duration plus the whole parent chain
    pub fn total_search_duration(&self) -> Duration {
        self.total_search_duration
    }

    pub fn criterias(&self) -> &str {
        &self.criterias
    }

    pub fn searched_tag(&self) -> &str {
        &self.searched_tag
    }

    pub fn is_sys_comp(&self) -> bool {
        self.sys_comp
    }

    pub fn is_validated(&self) -> bool {
        self.occurrences.test(self.elements_count())
    }

    pub fn is_password(&self) -> bool {
        self.found_element().map(|e| e.is_password).unwrap_or(false)
    }

    pub fn is_numeric(&self) -> bool {
        self.found_element().map(|e| e.is_numeric).unwrap_or(false)
    }

    pub fn is_iframe(&self) -> bool {
        self.found_element().map(|e| e.is_iframe).unwrap_or(false)
    }

    pub fn is_body(&self) -> bool {
        self.found_element().map(FoundElement::is_body).unwrap_or(false)
    }

    pub fn not_found_description(&self) -> String {
        format!("element not found [{}]", self.criterias)
    }

    /// Reporting view of this element
    pub fn summary(&self) -> ElementSummary {
        ElementSummary {
            tag: self.searched_tag.clone(),
            criterias: self.criterias.clone(),
            count: self.count,
            search_duration_ms: self.total_search_duration.as_millis(),
        }
    }

    fn selected(&self, status: &mut ActionStatus) -> Option<FoundElement> {
        let element = self.found_element().cloned();
        if element.is_none() {
            status.set_error(StatusCode::ObjectNotFound, self.not_found_description());
        }
        element
    }

    fn report(status: &mut ActionStatus, result: crate::Result<()>) {
        match result {
            Ok(()) => status.set_no_error(),
            Err(e) => status.set_error(StatusCode::from(&e), e.to_string()),
        }
    }

    // Reporting

    /// Send the outcome to the recorder and run the channel hook
    pub fn terminate(&self, status: &ActionStatus) {
        self.channel.recorder().update(status, Some(&self.summary()));
        self.channel.action_terminated(status);
    }

    /// Same as [`terminate`](Self::terminate) with a value and its data
    pub fn terminate_value(&self, status: &ActionStatus, value: &str, data: &str) {
        self.channel
            .recorder()
            .update_value(status, Some(&self.summary()), value, data);
        self.channel.action_terminated(status);
    }

    pub fn update_screen(&self, status: &ActionStatus) {
        self.channel.recorder().update_screen(status);
    }

    /// Assert the number of occurrences and finalize the action
    pub fn check_occurrences(&self, status: &mut ActionStatus, operator: Comparison, expected: usize) {
        if operator.test(self.count, expected) {
            status.set_no_error();
        } else {
            let message = format!(
                "[{}] expected occurrence(s) but [{}] occurrence(s) found using criterias [{}]",
                expected, self.count, self.criterias
            );
            status.set_error_value(StatusCode::OccurrencesError, message, self.count);
        }

        status.end_duration();
        self.update_screen(status);
        self.terminate_value(
            status,
            &self.count.to_string(),
            &format!("{} {}", operator.symbol(), expected),
        );
    }

    // Waits

    /// Wait until the bounding rectangle stops moving.
    ///
    /// Consecutive samples are compared pairwise; each differing pair
    /// consumes one unit of the interactable budget. The cached rectangle is
    /// updated once two samples match. Returns the consumed units.
    pub async fn wait_animation(&mut self) -> u32 {
        let Some(element) = self.found_element().cloned() else {
            return 0;
        };
        let engine = self.engine();
        let sample = self.channel.timing().animation_sample;

        let mut previous = match engine.get_bound_rect(&element).await {
            Ok(Some(rect)) => rect,
            _ => return 0,
        };

        let mut consumed = 0;
        while consumed < self.max_try_interactable {
            self.channel.sleep(sample).await;

            let current = match engine.get_bound_rect(&element).await {
                Ok(Some(rect)) => rect,
                _ => return consumed,
            };

            if current == previous {
                let index = self.start_one_index();
                if let Some(found) = self.found_elements.get_mut(index) {
                    found.update_bounding(current);
                }
                return consumed;
            }

            consumed += 1;
            self.channel.send_log(
                TRY_SEARCH,
                "Element is moving, wait before execute action",
                self.max_try_interactable - consumed,
            );
            previous = current;
        }
        consumed
    }

    async fn wait_interactable(&self, status: &mut ActionStatus, element: &FoundElement) {
        let engine = self.engine();
        let engine = &engine;
        let outcome = RetryPolicy::interactable(self.channel.timing(), self.max_try)
            .run(move || engine.mouse_move_to_element(element))
            .await;
        if outcome.apply_to(status).is_some() {
            status.set_no_error();
        }
    }

    // Mouse

    /// Hover the element once it is stable and interactable
    #[instrument(skip(self, status))]
    pub async fn over(
        &mut self,
        status: &mut ActionStatus,
        position: &MouseDirection,
        desktop_drag: bool,
        offset_x: i32,
        offset_y: i32,
    ) {
        self.wait_animation().await;

        let Some(element) = self.selected(status) else {
            return;
        };
        self.wait_interactable(status, &element).await;

        if status.is_passed() {
            let result = self
                .engine()
                .mouse_move_with_offset(&element, position, desktop_drag, offset_x, offset_y)
                .await;
            Self::report(status, result);
        }
    }

    /// Click, retried with a progressive delay while not interactable
    #[instrument(skip(self, status))]
    pub async fn click(&self, status: &mut ActionStatus, position: &MouseDirection) {
        let Some(element) = self.selected(status) else {
            self.channel.action_terminated(status);
            return;
        };

        let engine = self.engine();
        let (engine, element) = (&engine, &element);
        let outcome = RetryPolicy::progressive(self.channel.timing(), self.max_try)
            .run(move || engine.mouse_click(element, position, 0, 0))
            .await;

        if outcome.apply_to(status).is_some() {
            status.set_no_error();
        }
        self.channel.action_terminated(status);
    }

    pub async fn drag(&self, status: &mut ActionStatus, position: &MouseDirection, offset_x: i32, offset_y: i32) {
        if let Some(element) = self.selected(status) {
            let result = self.engine().drag(&element, position, offset_x, offset_y).await;
            Self::report(status, result);
        }
        self.channel.action_terminated(status);
    }

    /// Release the pointer at the end of a drag
    pub async fn release(&self, status: &mut ActionStatus, position: Option<&MouseDirection>, desktop_drag: bool) {
        match self.engine().release(position, desktop_drag).await {
            Ok(()) => status.set_passed(true),
            Err(e) => status.set_error(StatusCode::from(&e), e.to_string()),
        }
    }

    /// Drag from `position`, move by the direction offsets and release
    pub async fn swipe(&self, status: &mut ActionStatus, position: &MouseDirection, direction: &MouseDirection) {
        self.drag(status, position, 0, 0).await;
        if !status.is_passed() {
            return;
        }

        let moved = self
            .engine()
            .move_by_offset(direction.horizontal_direction(), direction.vertical_direction())
            .await;
        if let Err(e) = moved {
            status.set_error(StatusCode::from(&e), e.to_string());
            return;
        }
        self.release(status, None, false).await;
    }

    pub async fn mouse_wheel(&self, status: &mut ActionStatus, delta: i32) {
        let result = self.engine().scroll(self.found_element(), delta).await;
        Self::report(status, result);
    }

    pub async fn tap(&self, status: &mut ActionStatus, count: u32) {
        if let Some(element) = self.selected(status) {
            let result = self.engine().tap(count, &element).await;
            Self::report(status, result);
        }
    }

    pub async fn press(&self, status: &mut ActionStatus, duration_ms: u64, paths: &[String]) {
        if let Some(element) = self.selected(status) {
            let result = self.engine().press(duration_ms, paths, &element).await;
            Self::report(status, result);
        }
    }

    // Text

    pub async fn clear_text(&self, status: &mut ActionStatus, position: &MouseDirection) {
        if let Some(element) = self.selected(status) {
            let result = self.engine().clear_text(&element, position).await;
            Self::report(status, result);
        }
    }

    /// Hover, clear and type `text`; returns the text as it should be reported
    #[instrument(skip(self, status, text))]
    pub async fn enter_text(&mut self, status: &mut ActionStatus, text: &CalculatedValue) -> String {
        let position = MouseDirection::default();
        self.over(status, &position, false, 0, 0).await;

        if !status.is_passed() {
            return String::new();
        }

        self.update_screen(status);

        let calculated = text.calculated();
        if !calculated.starts_with(KEY_PREFIX) {
            self.clear_text(status, &position).await;
        }

        let entered = self.send_text(status, text).await;
        if self.is_password() {
            MASKED_TEXT.to_string()
        } else {
            entered
        }
    }

    /// Send `text` as key sequences through the interactable retry loop
    pub async fn send_text(&self, status: &mut ActionStatus, text: &CalculatedValue) -> String {
        let calculated = text.calculated();
        let keys = SendKeyData::parse(&calculated);

        if let Some(element) = self.selected(status) {
            let engine = self.engine();
            let (engine, element, keys) = (&engine, &element, &keys);
            let outcome = RetryPolicy::interactable(self.channel.timing(), self.max_try)
                .run(move || engine.send_text_data(element, keys))
                .await;
            if outcome.apply_to(status).is_some() {
                status.set_no_error();
            }
        }

        self.channel.action_terminated(status);
        calculated
    }

    // Select

    /// Select an option of a validated element
    pub async fn select(&self, status: &mut ActionStatus, property: &CalculatedProperty) {
        if !self.is_validated() {
            status.set_error(StatusCode::ObjectNotFound, self.not_found_description());
            return;
        }
        let Some(element) = self.selected(status) else {
            return;
        };

        let engine = self.engine();
        let (engine, element) = (&engine, &element);
        let outcome = RetryPolicy::interactable(self.channel.timing(), self.max_try)
            .run(move || engine.select_options_item(element, property))
            .await;
        if outcome.apply_to(status).is_some() {
            status.set_no_error();
        }
    }

    // Attributes

    fn ats_attribute(&self, name: &str) -> Option<String> {
        match name {
            ATS_OCCURRENCES => Some(self.count.to_string()),
            ATS_OCCURRENCES_INDEX => Some(self.index.to_string()),
            ATS_MAX_TRY => Some(self.max_try.to_string()),
            ATS_SEARCH_DURATION => Some(self.total_search_duration.as_millis().to_string()),
            ATS_SEARCH_TAG => Some(self.searched_tag.clone()),
            _ => None,
        }
    }

    fn ats_attribute_not_found(&self, name: &str) -> String {
        match name {
            ATS_OCCURRENCES => "0".to_string(),
            ATS_OCCURRENCES_INDEX => "-1".to_string(),
            ATS_MAX_TRY => self.max_try.to_string(),
            ATS_SEARCH_DURATION => self.total_search_duration.as_millis().to_string(),
            ATS_SEARCH_TAG => self.searched_tag.clone(),
            _ => String::new(),
        }
    }

    /// Attribute value, pseudo attributes included
    pub async fn get_attribute(&self, status: &mut ActionStatus, name: &str) -> Option<String> {
        let Some(element) = self.found_element() else {
            return Some(self.ats_attribute_not_found(name));
        };

        if name == ATS_TABLE_DATA {
            return Some(self.get_table_data().await);
        }
        if let Some(value) = self.ats_attribute(name) {
            return Some(value);
        }
        if !self.is_validated() {
            return None;
        }

        match self.engine().get_attribute(element, name, self.max_try).await {
            Ok(value) => value,
            Err(e) => {
                status.set_error(StatusCode::from(&e), e.to_string());
                None
            }
        }
    }

    /// Property action: read one attribute and report it
    pub async fn property(&self, status: &mut ActionStatus, name: &str) -> String {
        let value = if self.found_element().is_none() {
            status.set_error(StatusCode::ObjectNotFound, self.not_found_description());
            String::new()
        } else {
            match self.get_attribute(status, name).await {
                Some(value) => {
                    status.set_no_error();
                    value
                }
                None => {
                    let error = Error::attribute_not_set(name);
                    status.set_error(
                        StatusCode::from(&error),
                        format!("attribute '{}' not found", name),
                    );
                    String::new()
                }
            }
        };

        status.end_duration();
        self.terminate_value(status, &value, name);
        value
    }

    /// Pseudo attributes followed by the engine attributes
    pub async fn get_attributes(&self, reload: bool) -> Vec<CalculatedProperty> {
        let mut properties = vec![
            CalculatedProperty::new(ATS_OCCURRENCES, self.count.to_string()),
            CalculatedProperty::new(ATS_OCCURRENCES_INDEX, self.index.to_string()),
            CalculatedProperty::new(ATS_TABLE_DATA, self.get_table_data().await),
            CalculatedProperty::new(ATS_MAX_TRY, self.max_try.to_string()),
            CalculatedProperty::new(
                ATS_SEARCH_DURATION,
                self.total_search_duration.as_millis().to_string(),
            ),
            CalculatedProperty::new(ATS_SEARCH_TAG, self.searched_tag.as_str()),
        ];

        if let Some(element) = self.found_element() {
            match self.engine().get_attributes(element, reload).await {
                Ok(attributes) => properties.extend(attributes),
                Err(e) => debug!("Unable to load attributes: {}", e),
            }
        }
        properties
    }

    pub async fn get_css_attributes(&self) -> Vec<CalculatedProperty> {
        match self.found_element() {
            Some(element) => self
                .engine()
                .get_css_attributes(element)
                .await
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    // Data

    /// Text content as rows of cells
    pub async fn get_text_data(&self) -> Vec<Vec<Parameter>> {
        let engine = self.engine();

        if self.found_elements.len() > 1 && self.index == 0 {
            let rows = join_all(
                self.found_elements
                    .iter()
                    .map(|element| engine.get_attributes(element, true)),
            )
            .await;

            return rows
                .into_iter()
                .map(|attributes| {
                    attributes
                        .unwrap_or_default()
                        .iter()
                        .enumerate()
                        .map(|(i, p)| Parameter::named(i, p.name.as_str(), p.calculated()))
                        .collect()
                })
                .collect();
        }

        let Some(element) = self.found_element() else {
            return vec![empty_row()];
        };

        if element.tag.eq_ignore_ascii_case("select") {
            let options = engine.load_select_options(element).await.unwrap_or_default();
            if options.is_empty() {
                return vec![empty_row()];
            }
            return options
                .into_iter()
                .map(|option| {
                    if option.is_empty() {
                        empty_row()
                    } else {
                        option
                            .into_iter()
                            .enumerate()
                            .map(|(i, value)| Parameter::new(i, value))
                            .collect()
                    }
                })
                .collect();
        }

        match element.text.as_deref().filter(|t| !t.is_empty()) {
            Some(text) => text
                .split('\n')
                .map(|line| {
                    line.split('\t')
                        .enumerate()
                        .map(|(i, cell)| Parameter::new(i, cell))
                        .collect()
                })
                .collect(),
            None => vec![empty_row()],
        }
    }

    /// Text data as a JSON array of objects, one per row
    pub async fn get_table_data(&self) -> String {
        let rows: Vec<Value> = self
            .get_text_data()
            .await
            .into_iter()
            .map(|row| {
                Value::Object(
                    row.into_iter()
                        .map(|p| (p.name, Value::String(p.value)))
                        .collect::<Map<String, Value>>(),
                )
            })
            .collect();
        Value::Array(rows).to_string()
    }

    // Script

    /// Run a script on the resolved element
    pub async fn execute_script(&self, status: &mut ActionStatus, script: &str) -> Option<Value> {
        if !self.is_validated() {
            status.set_error(
                StatusCode::ObjectNotFound,
                "Element not found, cannot execute script action !",
            );
            return None;
        }

        match self.engine().execute_javascript(script, self.found_element()).await {
            Ok(value) => {
                status.set_no_error();
                Some(value)
            }
            Err(e) => {
                status.set_error(StatusCode::from(&e), e.to_string());
                None
            }
        }
    }
}
