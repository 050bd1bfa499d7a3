//! Scriptable in-memory page
//!
//! A small DOM stand-in backing tests and the CLI harness. Pages are
//! assembled with [`PageBuilder`], mirror the live Gemini composer
//! structurally, and can carry a [`GenerationScript`] that plays out a
//! send/generate/complete cycle: clicking the send button starts a
//! pending turn, and each state sample (an aria-label read of the send
//! button) counts down until the turn completes with a scripted reply.
//!
//! Everything lives behind one mutex; handles are ids into a node arena
//! so they stay valid while the tree mutates.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::dom::matcher::{NodeFacts, Selector};
use crate::dom::{Document, DomEvent, Element, ElementHandle, Window};
use crate::models::{ChatMode, FileUpload, GeminiTool, Locale};
use crate::selectors;

const APP_ROOT_URL: &str = "https://gemini.google.com/app";

/// One reply the scripted page produces when a turn completes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReply {
    pub text: String,
    pub image_count: usize,
    pub blocked: bool,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A reply that renders the locale's safety-refusal phrase.
    pub fn blocked() -> Self {
        Self {
            blocked: true,
            ..Self::default()
        }
    }

    pub fn with_images(mut self, count: usize) -> Self {
        self.image_count = count;
        self
    }
}

/// Drives the send/generate/complete cycle of a [`FakePage`].
///
/// `reads_per_turn` is the number of send-button label reads a pending
/// turn survives before completing, which for the polling loop means
/// the turn completes on the nth state sample.
#[derive(Debug, Clone)]
pub struct GenerationScript {
    pub reads_per_turn: usize,
    pub replies: Vec<ScriptedReply>,
}

impl GenerationScript {
    pub fn new(reads_per_turn: usize) -> Self {
        Self {
            reads_per_turn: reads_per_turn.max(1),
            replies: Vec::new(),
        }
    }

    pub fn reply(mut self, reply: ScriptedReply) -> Self {
        self.replies.push(reply);
        self
    }
}

/// Static model response placed in the page at build time.
#[derive(Debug, Clone, Default)]
pub struct ResponseFixture {
    pub text: Option<String>,
    pub image_count: usize,
    pub thumbs_up: bool,
}

impl ResponseFixture {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_images(mut self, count: usize) -> Self {
        self.image_count = count;
        self
    }

    pub fn with_thumbs_up(mut self) -> Self {
        self.thumbs_up = true;
        self
    }
}

struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    tag: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    clicks: usize,
    events: Vec<DomEvent>,
    files: Vec<FileUpload>,
}

impl Node {
    fn new(tag: &str, parent: Option<usize>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            text: None,
            clicks: 0,
            events: Vec::new(),
            files: Vec::new(),
        }
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(entry) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            entry.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
    }
}

struct PendingTurn {
    reads_left: usize,
    reply: ScriptedReply,
    response_id: usize,
}

struct ScriptState {
    reads_per_turn: usize,
    replies: VecDeque<ScriptedReply>,
    pending: Option<PendingTurn>,
    turn: usize,
}

struct PageInner {
    nodes: Vec<Node>,
    href: String,
    locale: Locale,
    script: Option<ScriptState>,
}

impl PageInner {
    fn new(href: String, locale: Locale) -> Self {
        let mut inner = Self {
            nodes: Vec::new(),
            href,
            locale,
            script: None,
        };
        inner.nodes.push(Node::new("body", None));
        inner
    }

    fn append(&mut self, parent: usize, tag: &str, attrs: &[(&str, &str)]) -> usize {
        let id = self.nodes.len();
        let mut node = Node::new(tag, Some(parent));
        for (name, value) in attrs {
            node.set_attr(name, value);
        }
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    fn detach(&mut self, id: usize) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&child| child != id);
        }
    }

    fn facts(&self, id: usize) -> NodeFacts {
        let node = &self.nodes[id];
        NodeFacts {
            tag: node.tag.clone(),
            attrs: node.attrs.clone(),
        }
    }

    fn path_facts(&self, id: usize) -> Vec<NodeFacts> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            path.push(self.facts(node_id));
            current = self.nodes[node_id].parent;
        }
        path.reverse();
        path
    }

    fn node_matches(&self, id: usize, selector: &str) -> bool {
        Selector::parse(selector)
            .map(|parsed| parsed.matches(&self.path_facts(id)))
            .unwrap_or(false)
    }

    /// Descendants of `origin` (the whole document for the root) in
    /// document order that match the selector.
    fn query_from(&self, origin: usize, selector: &str) -> Vec<usize> {
        let Some(parsed) = Selector::parse(selector) else {
            return Vec::new();
        };
        let mut matched = Vec::new();
        let mut stack: Vec<usize> = self.nodes[origin].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if parsed.matches(&self.path_facts(id)) {
                matched.push(id);
            }
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        matched
    }

    fn collect_text(&self, id: usize, out: &mut String) {
        if let Some(text) = &self.nodes[id].text {
            out.push_str(text);
        }
        for &child in &self.nodes[id].children {
            self.collect_text(child, out);
        }
    }

    fn text_content(&self, id: usize) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn set_text_content(&mut self, id: usize, text: &str) {
        let children = std::mem::take(&mut self.nodes[id].children);
        for child in children {
            self.nodes[child].parent = None;
        }
        self.nodes[id].text = Some(text.to_string());
    }

    fn find_first(&self, selector: &str) -> Option<usize> {
        self.query_from(0, selector).into_iter().next()
    }

    fn click(&mut self, id: usize) {
        self.nodes[id].clicks += 1;
        if self.node_matches(id, selectors::SEND_BUTTON) {
            self.on_send_clicked(id);
        } else if self.node_matches(id, selectors::NEW_CHAT_LINK) {
            self.on_new_chat_clicked();
        }
    }

    fn on_send_clicked(&mut self, send_id: usize) {
        let Some(script) = self.script.as_mut() else {
            return;
        };

        if let Some(pending) = script.pending.take() {
            // Clicking the stop button aborts the pending turn. The
            // partial response keeps its text and gains feedback
            // controls, but no images land.
            self.finish_response(pending.response_id, 0);
            let label = selectors::aria_labels(self.locale).send_button;
            self.nodes[send_id].set_attr("aria-label", label);
            return;
        }

        script.turn += 1;
        let turn = script.turn;
        let reply = script.replies.pop_front().unwrap_or_default();

        let text = if !reply.text.is_empty() {
            reply.text.clone()
        } else if reply.blocked {
            blocked_phrase(self.locale).to_string()
        } else {
            format!("Simulated response {turn}")
        };

        let response_id = self.append(0, "model-response", &[]);
        let text_id = self.append(response_id, "div", &[]);
        self.nodes[text_id].text = Some(text);

        let stop_label = selectors::aria_labels(self.locale).stop_button;
        self.nodes[send_id].set_attr("aria-label", stop_label);

        if self.href == APP_ROOT_URL {
            self.href = format!("{APP_ROOT_URL}/sim{turn:04}");
        }

        if let Some(script) = self.script.as_mut() {
            script.pending = Some(PendingTurn {
                reads_left: script.reads_per_turn,
                reply,
                response_id,
            });
        }
    }

    fn on_new_chat_clicked(&mut self) {
        self.href = APP_ROOT_URL.to_string();
        for id in self.query_from(0, selectors::MODEL_RESPONSE) {
            self.detach(id);
        }
        if let Some(script) = self.script.as_mut() {
            script.pending = None;
        }
    }

    /// Attaches images and feedback controls to a response, marking the
    /// turn complete.
    fn finish_response(&mut self, response_id: usize, image_count: usize) {
        let turn = self.script.as_ref().map(|s| s.turn).unwrap_or(0);
        for index in 0..image_count {
            let wrapper = self.append(response_id, "generated-image", &[]);
            let src = format!("https://lh3.googleusercontent.com/sim{turn:04}-{index}=s1024-rj");
            self.append(wrapper, "img", &[("src", &src)]);
        }
        let thumbs_label = selectors::aria_labels(self.locale).thumbs_up;
        self.append(response_id, "button", &[("aria-label", thumbs_label)]);
    }

    fn attribute(&mut self, id: usize, name: &str) -> Option<String> {
        if name == "aria-label" && self.node_matches(id, selectors::SEND_BUTTON) {
            self.tick_pending(id);
        }
        self.nodes[id].attr(name)
    }

    fn tick_pending(&mut self, send_id: usize) {
        let Some(script) = self.script.as_mut() else {
            return;
        };
        let Some(pending) = script.pending.as_mut() else {
            return;
        };
        pending.reads_left = pending.reads_left.saturating_sub(1);
        if pending.reads_left > 0 {
            return;
        }

        if let Some(finished) = script.pending.take() {
            self.finish_response(finished.response_id, finished.reply.image_count);
            let label = selectors::aria_labels(self.locale).send_button;
            self.nodes[send_id].set_attr("aria-label", label);
        }
    }
}

fn blocked_phrase(locale: Locale) -> &'static str {
    match locale {
        Locale::Ko => "안전 장치로 인해 이미지를 생성할 수 없습니다",
        Locale::En => "I was unable to generate this image due to safety settings",
    }
}

/// In-memory page implementing [`Document`] and [`Window`].
///
/// Cloning shares the underlying page, so a test can keep one handle
/// for inspection while the client drives another.
#[derive(Clone)]
pub struct FakePage {
    inner: Arc<Mutex<PageInner>>,
}

impl FakePage {
    pub fn builder() -> PageBuilder {
        PageBuilder::new()
    }

    /// Fully furnished composer: send button, prompt input, new chat
    /// link, upload controls, tools and mode menus. The starting point
    /// for most scripted scenarios.
    pub fn gemini_app(locale: Locale) -> FakePage {
        PageBuilder::gemini_app(locale).build()
    }

    pub fn document(&self) -> Arc<dyn Document> {
        Arc::new(self.clone())
    }

    pub fn window(&self) -> Arc<dyn Window> {
        Arc::new(self.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PageInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handle(&self, id: usize) -> ElementHandle {
        Arc::new(FakeElement {
            inner: Arc::clone(&self.inner),
            id,
        })
    }

    /// Total clicks across all elements matching the selector.
    pub fn click_count(&self, selector: &str) -> usize {
        let inner = self.lock();
        inner
            .query_from(0, selector)
            .into_iter()
            .map(|id| inner.nodes[id].clicks)
            .sum()
    }

    /// Events dispatched on the first element matching the selector.
    pub fn events(&self, selector: &str) -> Vec<DomEvent> {
        let inner = self.lock();
        inner
            .find_first(selector)
            .map(|id| inner.nodes[id].events.clone())
            .unwrap_or_default()
    }

    /// Files attached to the file input.
    pub fn uploaded_files(&self) -> Vec<FileUpload> {
        let inner = self.lock();
        inner
            .find_first(selectors::FILE_INPUT)
            .map(|id| inner.nodes[id].files.clone())
            .unwrap_or_default()
    }

    /// Current text of the prompt input.
    pub fn prompt_text(&self) -> String {
        let inner = self.lock();
        inner
            .find_first(selectors::PROMPT_INPUT)
            .map(|id| inner.text_content(id))
            .unwrap_or_default()
    }

    pub fn href(&self) -> String {
        self.lock().href.clone()
    }

    pub fn set_href(&self, href: &str) {
        self.lock().href = href.to_string();
    }

    pub fn set_send_button_label(&self, label: &str) {
        let mut inner = self.lock();
        if let Some(id) = inner.find_first(selectors::SEND_BUTTON) {
            inner.nodes[id].set_attr("aria-label", label);
        }
    }

    /// Appends a static model response, as if a turn had finished.
    pub fn push_response(&self, fixture: ResponseFixture) {
        let mut inner = self.lock();
        let locale = inner.locale;
        append_response_fixture(&mut inner, locale, &fixture);
    }
}

impl Document for FakePage {
    fn query_selector(&self, selector: &str) -> Option<ElementHandle> {
        let id = {
            let inner = self.lock();
            inner.find_first(selector)
        };
        id.map(|id| self.handle(id))
    }

    fn query_selector_all(&self, selector: &str) -> Vec<ElementHandle> {
        let ids = {
            let inner = self.lock();
            inner.query_from(0, selector)
        };
        ids.into_iter().map(|id| self.handle(id)).collect()
    }
}

impl Window for FakePage {
    fn location_href(&self) -> String {
        self.lock().href.clone()
    }
}

struct FakeElement {
    inner: Arc<Mutex<PageInner>>,
    id: usize,
}

impl FakeElement {
    fn lock(&self) -> std::sync::MutexGuard<'_, PageInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Element for FakeElement {
    fn tag_name(&self) -> String {
        self.lock().nodes[self.id].tag.clone()
    }

    fn text_content(&self) -> String {
        self.lock().text_content(self.id)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.lock().attribute(self.id, name)
    }

    fn set_text_content(&self, text: &str) {
        self.lock().set_text_content(self.id, text);
    }

    fn click(&self) {
        self.lock().click(self.id);
    }

    fn dispatch(&self, event: DomEvent) {
        self.lock().nodes[self.id].events.push(event);
    }

    fn set_files(&self, files: &[FileUpload]) {
        self.lock().nodes[self.id].files = files.to_vec();
    }

    fn query_selector(&self, selector: &str) -> Option<ElementHandle> {
        let id = {
            let inner = self.lock();
            inner.query_from(self.id, selector).into_iter().next()
        };
        id.map(|id| {
            Arc::new(FakeElement {
                inner: Arc::clone(&self.inner),
                id,
            }) as ElementHandle
        })
    }

    fn query_selector_all(&self, selector: &str) -> Vec<ElementHandle> {
        let ids = {
            let inner = self.lock();
            inner.query_from(self.id, selector)
        };
        ids.into_iter()
            .map(|id| {
                Arc::new(FakeElement {
                    inner: Arc::clone(&self.inner),
                    id,
                }) as ElementHandle
            })
            .collect()
    }
}

fn append_response_fixture(inner: &mut PageInner, locale: Locale, fixture: &ResponseFixture) {
    let response_id = inner.append(0, "model-response", &[]);
    if let Some(text) = &fixture.text {
        let text_id = inner.append(response_id, "div", &[]);
        inner.nodes[text_id].text = Some(text.clone());
    }
    for index in 0..fixture.image_count {
        let wrapper = inner.append(response_id, "generated-image", &[]);
        let src = format!("https://lh3.googleusercontent.com/image-{index}=s1024-rj");
        inner.append(wrapper, "img", &[("src", &src)]);
    }
    if fixture.thumbs_up {
        let label = selectors::aria_labels(locale).thumbs_up;
        inner.append(response_id, "button", &[("aria-label", label)]);
    }
}

/// Assembles a [`FakePage`] part by part, mirroring the composer pieces
/// of the live page. Omitted parts simply do not exist, which is how
/// the missing-element error paths get exercised.
pub struct PageBuilder {
    href: String,
    locale: Locale,
    send_button_label: Option<String>,
    prompt_input: bool,
    new_chat_link: bool,
    tools_button_label: Option<String>,
    menu_items: Vec<(String, String)>,
    upload_button: bool,
    file_input: bool,
    mode_text: Option<String>,
    deselect_chip_text: Option<String>,
    responses: Vec<ResponseFixture>,
    script: Option<GenerationScript>,
}

impl Default for PageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PageBuilder {
    pub fn new() -> Self {
        Self {
            href: APP_ROOT_URL.to_string(),
            locale: Locale::Ko,
            send_button_label: None,
            prompt_input: false,
            new_chat_link: false,
            tools_button_label: None,
            menu_items: Vec::new(),
            upload_button: false,
            file_input: false,
            mode_text: None,
            deselect_chip_text: None,
            responses: Vec::new(),
            script: None,
        }
    }

    /// Preset with every composer control present for the locale.
    pub fn gemini_app(locale: Locale) -> Self {
        let labels = selectors::aria_labels(locale);
        let mut builder = Self::new()
            .locale(locale)
            .send_button(labels.send_button)
            .prompt_input()
            .new_chat_link()
            .upload_button()
            .file_input()
            .tools_button(labels.tools_button)
            .mode_switch(selectors::mode_label(locale, ChatMode::Fast));
        for tool in GeminiTool::ALL {
            builder = builder.menu_item("menuitemcheckbox", selectors::tool_label(locale, tool));
        }
        for mode in [ChatMode::Fast, ChatMode::Thinking, ChatMode::Pro] {
            builder = builder.menu_item("menuitemradio", selectors::mode_label(locale, mode));
        }
        builder
    }

    pub fn href(mut self, href: &str) -> Self {
        self.href = href.to_string();
        self
    }

    /// Locale used for scripted labels and fixture feedback buttons.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn send_button(mut self, aria_label: &str) -> Self {
        self.send_button_label = Some(aria_label.to_string());
        self
    }

    pub fn prompt_input(mut self) -> Self {
        self.prompt_input = true;
        self
    }

    pub fn new_chat_link(mut self) -> Self {
        self.new_chat_link = true;
        self
    }

    pub fn tools_button(mut self, label: &str) -> Self {
        self.tools_button_label = Some(label.to_string());
        self
    }

    pub fn menu_item(mut self, role: &str, text: &str) -> Self {
        self.menu_items.push((role.to_string(), text.to_string()));
        self
    }

    pub fn upload_button(mut self) -> Self {
        self.upload_button = true;
        self
    }

    pub fn file_input(mut self) -> Self {
        self.file_input = true;
        self
    }

    pub fn mode_switch(mut self, text: &str) -> Self {
        self.mode_text = Some(text.to_string());
        self
    }

    pub fn deselect_chip(mut self, text: &str) -> Self {
        self.deselect_chip_text = Some(text.to_string());
        self
    }

    pub fn response(mut self, fixture: ResponseFixture) -> Self {
        self.responses.push(fixture);
        self
    }

    pub fn script(mut self, script: GenerationScript) -> Self {
        self.script = Some(script);
        self
    }

    pub fn build(self) -> FakePage {
        let mut inner = PageInner::new(self.href, self.locale);

        if let Some(label) = &self.send_button_label {
            inner.append(
                0,
                "button",
                &[("class", "send-button"), ("aria-label", label)],
            );
        }
        if self.prompt_input {
            inner.append(
                0,
                "div",
                &[("contenteditable", "true"), ("role", "textbox")],
            );
        }
        if self.new_chat_link {
            inner.append(0, "a", &[("href", "/app")]);
        }
        if let Some(label) = &self.tools_button_label {
            let id = inner.append(0, "button", &[("aria-label", label)]);
            inner.nodes[id].text = Some(label.clone());
        }
        for (role, text) in &self.menu_items {
            let id = inner.append(0, "div", &[("role", role)]);
            inner.nodes[id].text = Some(text.clone());
        }
        if self.upload_button {
            inner.append(0, "button", &[("class", "upload-card-button")]);
        }
        if self.file_input {
            inner.append(0, "input", &[("type", "file"), ("multiple", "")]);
        }
        for fixture in &self.responses {
            append_response_fixture(&mut inner, self.locale, fixture);
        }
        if let Some(text) = &self.mode_text {
            let id = inner.append(0, "div", &[("class", "input-area-switch")]);
            inner.nodes[id].text = Some(text.clone());
        }
        if let Some(text) = &self.deselect_chip_text {
            let id = inner.append(0, "button", &[]);
            inner.nodes[id].text = Some(text.clone());
        }

        if let Some(script) = self.script {
            inner.script = Some(ScriptState {
                reads_per_turn: script.reads_per_turn,
                replies: script.replies.into(),
                pending: None,
                turn: 0,
            });
        }

        FakePage {
            inner: Arc::new(Mutex::new(inner)),
        }
    }
}
