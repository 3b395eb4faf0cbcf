//! 评分引擎注入服务 - 业务能力层
//!
//! 负责：
//! - 把文档里已有的答题处理函数换成转发给注入控制器的存根
//! - 补齐控制器依赖但文档中缺少的标记（导航栏、移动端题号面板、成绩弹窗）
//! - 在说明区域写入计分规则
//! - 注入或替换 `<script id="quiz-scoring-engine">`

use crate::infrastructure::scanner::find_element_end;
use crate::infrastructure::{PatternExtractor, Target};
use crate::models::element_ids::{self, present_in};
use crate::models::marking::{MarkingScheme, NegativeMarking};
use crate::models::question::QuestionSet;
use crate::utils::html::escape;
use crate::utils::template::{element_id_vars, render};
use crate::workflow::quiz_session::PersistenceScope;
use crate::workflow::scoring::trim_number;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// 注入脚本的 `id`
pub const ENGINE_SCRIPT_ID: &str = "quiz-scoring-engine";
/// 说明区域中计分规则条目的 `id`
pub const MARKING_NOTE_ID: &str = "marking-scheme-note";

/// 来源文档中的处理函数 → 控制器方法
pub const DELEGATED_HANDLERS: &[(&str, &str)] = &[
    ("startQuiz", "start"),
    ("submitQuiz", "submit"),
    ("nextQuestion", "next"),
    ("prevQuestion", "prev"),
    ("markForReview", "toggleMark"),
    ("showResults", "showResults"),
];

/// 评分引擎的配置
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub scheme: MarkingScheme,
    pub persistence: PersistenceScope,
    pub default_duration_secs: u32,
    pub fallback_question_count: usize,
    /// 本地存储键，通常由标题生成
    pub storage_key: String,
}

/// 引擎脚本的放置方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePlacement {
    /// 新注入
    Injected,
    /// 替换了上一次注入的脚本
    Replaced,
}

/// 注入结果
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub html: String,
    pub engine: EnginePlacement,
    /// 被换成存根的来源函数
    pub replaced_functions: Vec<String>,
    /// 补齐的标记片段数量
    pub markup_added: usize,
    /// 是否写入了计分规则说明
    pub marking_note: bool,
    /// 引擎使用的倒计时秒数
    pub duration_secs: u32,
}

/// 写进脚本的配置对象
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EngineConfig<'a> {
    positive_mark: f64,
    negative_mark: f64,
    negative_marking: &'static str,
    persistence: &'static str,
    duration_secs: u32,
    fallback_count: usize,
    storage_key: &'a str,
    ids: BTreeMap<String, &'static str>,
    handlers: BTreeMap<&'static str, &'static str>,
}

/// 评分引擎注入服务
pub struct ScoringInjector {
    settings: EngineSettings,
}

impl ScoringInjector {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn inject(
        &self,
        html: &str,
        questions: &QuestionSet,
        extractor: &PatternExtractor,
    ) -> ScoredDocument {
        let duration_secs = self.detect_duration(html, extractor);
        let (html, replaced_functions) = delegate_handlers(html, extractor);
        let (html, marking_note) = self.write_marking_note(&html, questions, extractor);
        let (html, markup_added) = add_missing_markup(&html, extractor);
        let (html, engine) = self.place_engine(&html, questions, duration_secs, extractor);

        ScoredDocument {
            html,
            engine,
            replaced_functions,
            markup_added,
            marking_note,
            duration_secs,
        }
    }

    /// 文档脚本里的倒计时秒数，没有时用默认值
    fn detect_duration(&self, html: &str, extractor: &PatternExtractor) -> u32 {
        extractor
            .extract(html, Target::TimerSeconds)
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(self.settings.default_duration_secs)
    }

    /// 计分规则说明文字
    pub fn marking_note_text(&self, questions: &QuestionSet) -> String {
        let scheme = &self.settings.scheme;
        let count = questions.display_count(self.settings.fallback_question_count);
        let max_score: f64 = if questions.is_empty() {
            count as f64 * scheme.nominal_award()
        } else {
            questions.questions.iter().map(|q| scheme.award(q)).sum()
        };
        let (award, penalty) = match scheme.negative_marking {
            NegativeMarking::Flat => (
                format!("+{}", trim_number(scheme.positive_mark)),
                format!("−{}", trim_number(scheme.negative_mark)),
            ),
            NegativeMarking::Fractional => (
                "+marks".to_string(),
                format!("−{}×marks", trim_number(scheme.negative_mark)),
            ),
        };
        format!(
            "✅ {} correct · ❌ {} wrong · ⏭️ 0 unanswered · 📝 {} questions · 🏆 Max {}",
            award,
            penalty,
            count,
            trim_number(max_score)
        )
    }

    fn write_marking_note(
        &self,
        html: &str,
        questions: &QuestionSet,
        extractor: &PatternExtractor,
    ) -> (String, bool) {
        let Some(block) = extractor.find(html, Target::InstructionsBlock) else {
            debug!("没有说明区域，跳过计分规则说明");
            return (html.to_string(), false);
        };
        let note = format!(
            r#"<div class="instruction-item" id="{}">{}</div>"#,
            MARKING_NOTE_ID,
            escape(&self.marking_note_text(questions))
        );

        let inner = block.inner(html);
        let marker = format!("id=\"{}\"", MARKING_NOTE_ID);
        if let Some(marker_at) = inner.find(&marker) {
            let tag_start = inner[..marker_at].rfind('<').map(|i| block.inner_start + i);
            if let Some(start) = tag_start {
                if let Some(end) = find_element_end(html, start, "div") {
                    return (splice(html, start, end, &note), true);
                }
            }
        }
        (splice(html, block.inner_end, block.inner_end, &note), true)
    }

    fn place_engine(
        &self,
        html: &str,
        questions: &QuestionSet,
        duration_secs: u32,
        extractor: &PatternExtractor,
    ) -> (String, EnginePlacement) {
        let script = self.engine_script(questions, duration_secs);
        if let Some(existing) = extractor.find_tagged_block(html, ENGINE_SCRIPT_ID) {
            return (
                splice(html, existing.start, existing.end, &script),
                EnginePlacement::Replaced,
            );
        }
        let at = extractor.body_close(html).unwrap_or(html.len());
        (
            splice(html, at, at, &format!("{}\n", script)),
            EnginePlacement::Injected,
        )
    }

    /// 生成完整的 `<script>` 块
    pub fn engine_script(&self, questions: &QuestionSet, duration_secs: u32) -> String {
        let scheme = &self.settings.scheme;
        let config = EngineConfig {
            positive_mark: scheme.positive_mark,
            negative_mark: scheme.negative_mark,
            negative_marking: scheme.negative_marking.as_str(),
            persistence: self.settings.persistence.as_str(),
            duration_secs,
            fallback_count: self.settings.fallback_question_count,
            storage_key: &self.settings.storage_key,
            ids: element_ids::ALL
                .iter()
                .map(|(key, id)| (key.trim_start_matches("ID_").to_ascii_lowercase(), *id))
                .collect(),
            handlers: DELEGATED_HANDLERS.iter().copied().collect(),
        };
        // 序列化一个只含数字和短字符串的结构体不会失败
        let config_json = serde_json::to_string(&config)
            .unwrap_or_else(|_| "{}".to_string())
            .replace("</", "<\\/");

        let question_source = match &questions.identifier {
            Some(name) => format!(
                "(typeof {0} !== 'undefined' && Array.isArray({0})) ? {0} : []",
                name
            ),
            None => "[]".to_string(),
        };

        format!(
            "<script id=\"{}\">\n{}</script>",
            ENGINE_SCRIPT_ID,
            render(
                ENGINE_TEMPLATE,
                &[
                    ("CONFIG_JSON", config_json),
                    ("QUESTION_SOURCE", question_source),
                ],
            )
        )
    }
}

/// 存根：存在控制器时转发调用
pub fn handler_stub(name: &str, method: &str) -> String {
    format!(
        "function {0}() {{ return window.quizEngine ? window.quizEngine.{1}.apply(window.quizEngine, arguments) : undefined; }}",
        name, method
    )
}

/// 把来源脚本中的处理函数替换为存根，返回被替换的函数名
pub fn delegate_handlers(html: &str, extractor: &PatternExtractor) -> (String, Vec<String>) {
    let mut out = html.to_string();
    let mut replaced = Vec::new();
    for &(name, method) in DELEGATED_HANDLERS {
        let Some(found) = extractor.find(&out, Target::NamedFunction(name)) else {
            continue;
        };
        let stub = handler_stub(name, method);
        if found.outer(&out) != stub {
            debug!("替换处理函数 {}", name);
        }
        out = splice(&out, found.start, found.end, &stub);
        replaced.push(name.to_string());
    }
    (out, replaced)
}

/// 补齐控制器依赖的标记，返回补齐的片段数量
pub fn add_missing_markup(html: &str, extractor: &PatternExtractor) -> (String, usize) {
    let mut fragments = Vec::new();

    if !present_in(html, element_ids::QUESTION_CONTAINER) {
        fragments.push(QUIZ_MARKUP);
    }
    if !present_in(html, element_ids::TIMER) {
        fragments.push(TIMER_MARKUP);
    }
    if !present_in(html, element_ids::NAV) {
        fragments.push(NAV_MARKUP);
    }
    if !present_in(html, element_ids::MOBILE_PALETTE) {
        fragments.push(MOBILE_PALETTE_MARKUP);
    }
    if !present_in(html, element_ids::RESULT_MODAL) {
        if present_in(html, element_ids::METRICS) {
            fragments.push(RESULT_MODAL_MARKUP_NO_METRICS);
        } else {
            fragments.push(RESULT_MODAL_MARKUP);
        }
    }

    if fragments.is_empty() {
        return (html.to_string(), 0);
    }

    let vars = element_id_vars();
    let markup: String = fragments
        .iter()
        .map(|fragment| render(fragment, &vars))
        .collect::<Vec<_>>()
        .join("\n");
    let markup = format!("{}\n", markup);

    let at = extractor
        .find_tagged_block(html, ENGINE_SCRIPT_ID)
        .map(|m| m.start)
        .or_else(|| extractor.body_close(html))
        .unwrap_or(html.len());
    (splice(html, at, at, &markup), fragments.len())
}

/// 由标题生成本地存储键
pub fn storage_key_for(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "quiz:default".to_string()
    } else {
        format!("quiz:{}", slug)
    }
}

fn splice(html: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(html.len() + replacement.len());
    out.push_str(&html[..start]);
    out.push_str(replacement);
    out.push_str(&html[end..]);
    out
}

const QUIZ_MARKUP: &str = r#"<div id="%%ID_QUIZ%%" class="container">
  <div id="%%ID_QUESTION%%" class="question-panel"></div>
  <div id="%%ID_PALETTE%%" class="palette"><div class="palette-title">Questions</div><div class="q-numbers"></div></div>
</div>"#;

const TIMER_MARKUP: &str = r#"<div class="header header-timer"><span id="%%ID_TIMER%%" class="timer">⏱ --:--</span></div>"#;

const NAV_MARKUP: &str = r#"<div id="%%ID_NAV%%">
  <button type="button" id="%%ID_PREV%%">← Prev</button>
  <button type="button" id="%%ID_MARK%%">🔖 Mark</button>
  <button type="button" id="%%ID_PALETTE_TOGGLE%%">☰ Questions</button>
  <button type="button" id="%%ID_NEXT%%">Next →</button>
  <button type="button" id="%%ID_SUBMIT%%" class="submit-btn">Submit</button>
</div>"#;

const MOBILE_PALETTE_MARKUP: &str = r#"<div id="%%ID_MOBILE_PALETTE%%"><div class="palette-title">Questions</div><div class="q-numbers"></div></div>"#;

const RESULT_MODAL_MARKUP: &str = r#"<div id="%%ID_RESULT_MODAL%%">
  <div class="result">
    <div class="result-title">📊 Result</div>
    <div id="%%ID_METRICS%%" class="metrics"></div>
    <div class="estimate-note">Percentile is a simulated estimate, not based on real results.</div>
    <div class="result-actions">
      <button type="button" data-action="review">🔍 Review answers</button>
      <button type="button" class="secondary" data-action="retake">↻ Retake</button>
    </div>
  </div>
</div>"#;

const RESULT_MODAL_MARKUP_NO_METRICS: &str = r#"<div id="%%ID_RESULT_MODAL%%">
  <div class="result">
    <div class="result-title">📊 Result</div>
    <div class="estimate-note">Percentile is a simulated estimate, not based on real results.</div>
    <div class="result-actions">
      <button type="button" data-action="review">🔍 Review answers</button>
      <button type="button" class="secondary" data-action="retake">↻ Retake</button>
    </div>
  </div>
</div>"#;

const ENGINE_TEMPLATE: &str = r##"(function () {
  'use strict';
  var CONFIG = %%CONFIG_JSON%%;
  var IDS = CONFIG.ids;
  var QUESTIONS = %%QUESTION_SOURCE%%;
  var THEME_KEY = 'quiz-theme-mode';

  function byId(id) { return document.getElementById(id); }
  function filled(n, value) { var out = new Array(n); for (var i = 0; i < n; i++) out[i] = value; return out; }
  function pad(v) { return (v < 10 ? '0' : '') + v; }
  function clock(secs) { return pad(Math.floor(secs / 60)) + ':' + pad(secs % 60); }
  function round2(v) { return Math.round(v * 100) / 100; }
  function has(obj, key) { return Object.prototype.hasOwnProperty.call(obj, key); }
  function inside(id, el) { var root = byId(id); return !!root && root.contains(el); }

  function weightOf(q) {
    var m = (q.marks === undefined || q.marks === null) ? 1 : Number(q.marks);
    return (isFinite(m) && m > 0) ? m : 0;
  }

  function correctOf(q) {
    var c = Number(q.correct);
    var n = (q.options || []).length;
    return (Number.isInteger(c) && c >= 1 && c <= n) ? c : null;
  }

  function scoreQuiz(questions, answers) {
    var fractional = CONFIG.negativeMarking === 'fractional';
    var correct = 0, wrong = 0, raw = 0, max = 0;
    questions.forEach(function (q, i) {
      var award = fractional ? weightOf(q) : CONFIG.positiveMark;
      var penalty = fractional ? weightOf(q) * CONFIG.negativeMark : CONFIG.negativeMark;
      max += award;
      if (!has(answers, i)) return;
      var c = correctOf(q);
      if (c !== null && answers[i] === c) { correct++; raw += award; }
      else { wrong++; raw -= penalty; }
    });
    var total = questions.length;
    var percentage = max > 0 ? 100 * raw / max : 0;
    var percentile = max > 0 ? Math.min(99.9, Math.max(0, percentage + (100 - percentage) * 0.3)) : 0;
    return {
      total: total, correct: correct, wrong: wrong, unanswered: total - correct - wrong,
      raw: raw, max: max, percentage: percentage, percentile: percentile
    };
  }

  class QuizController {
    constructor(questions) {
      var n = questions.length;
      this.questions = questions;
      this.state = {
        phase: 'NotStarted',
        current: 0,
        answers: {},
        visited: filled(n, false),
        marked: filled(n, false),
        timeSpent: filled(n, 0),
        remaining: CONFIG.durationSecs,
        enteredAt: null,
        report: null
      };
      this.timerId = null;
    }

    total() { return this.questions.length; }
    answeredCount() { var s = this.state, n = 0; for (var i = 0; i < this.total(); i++) if (has(s.answers, i)) n++; return n; }
    isLocked() { return this.state.phase === 'Submitted' || this.state.phase === 'Reviewing'; }

    load() {
      var raw = null;
      try { raw = window.localStorage.getItem(CONFIG.storageKey); } catch (e) { return; }
      if (!raw) return;
      var saved;
      try { saved = JSON.parse(raw); } catch (e) { return; }
      var s = this.state, n = this.total(), self = this;
      Object.keys(saved.answers || {}).forEach(function (key) {
        var i = Number(key), opt = Number(saved.answers[key]);
        if (Number.isInteger(i) && i >= 0 && i < n && Number.isInteger(opt) &&
            opt >= 1 && opt <= (self.questions[i].options || []).length) {
          s.answers[i] = opt;
        }
      });
      if (CONFIG.persistence === 'full') {
        if (Array.isArray(saved.visited) && saved.visited.length === n) s.visited = saved.visited.map(Boolean);
        if (Array.isArray(saved.marked) && saved.marked.length === n) s.marked = saved.marked.map(Boolean);
        if (Array.isArray(saved.time_spent) && saved.time_spent.length === n) s.timeSpent = saved.time_spent.map(Number);
      }
    }

    save() {
      var s = this.state;
      var snapshot = { answers: s.answers };
      if (CONFIG.persistence === 'full') {
        snapshot.visited = s.visited;
        snapshot.marked = s.marked;
        snapshot.time_spent = s.timeSpent;
      }
      try { window.localStorage.setItem(CONFIG.storageKey, JSON.stringify(snapshot)); } catch (e) { }
    }

    clearSaved() {
      try { window.localStorage.removeItem(CONFIG.storageKey); } catch (e) { }
    }

    startScreen() { return byId(IDS.start) || document.querySelector('.start-screen'); }

    start() {
      var s = this.state;
      if (s.phase !== 'NotStarted') return false;
      s.phase = 'InProgress';
      var screen = this.startScreen();
      if (screen) screen.style.display = 'none';
      this.setLayoutVisible(true);
      if (this.total() > 0) s.visited[s.current] = true;
      s.enteredAt = Date.now();
      var self = this;
      this.timerId = window.setInterval(function () { self.tick(); }, 1000);
      this.render();
      return true;
    }

    setLayoutVisible(visible) {
      [IDS.quiz, IDS.nav].forEach(function (id) {
        var el = byId(id);
        if (el) el.style.display = visible ? '' : 'none';
      });
    }

    tick() {
      var s = this.state;
      if (s.phase !== 'InProgress') return;
      s.remaining = Math.max(0, s.remaining - 1);
      this.renderTimer();
      if (s.remaining === 0) this.finalize();
    }

    flushTime() {
      var s = this.state;
      if (s.enteredAt === null || s.phase === 'Reviewing' || this.total() === 0) return;
      var now = Date.now();
      s.timeSpent[s.current] += Math.round((now - s.enteredAt) / 1000);
      s.enteredAt = s.phase === 'InProgress' ? now : null;
    }

    goto(index) {
      var s = this.state;
      if (s.phase === 'NotStarted' || !Number.isInteger(index) || index < 0 || index >= this.total()) return false;
      this.flushTime();
      s.current = index;
      if (s.phase === 'InProgress') {
        s.visited[index] = true;
        if (CONFIG.persistence === 'full') this.save();
      }
      this.closePalette();
      this.render();
      return true;
    }

    next() { return this.state.current + 1 < this.total() ? this.goto(this.state.current + 1) : false; }
    prev() { return this.state.current > 0 ? this.goto(this.state.current - 1) : false; }

    select(option) {
      var s = this.state;
      if (s.phase !== 'InProgress') return false;
      var q = this.questions[s.current];
      var opt = Number(option);
      if (!q || !Number.isInteger(opt) || opt < 1 || opt > (q.options || []).length) return false;
      s.answers[s.current] = opt;
      this.save();
      this.render();
      return true;
    }

    toggleMark() {
      var s = this.state;
      if (s.phase !== 'InProgress' || this.total() === 0) return false;
      s.marked[s.current] = !s.marked[s.current];
      if (CONFIG.persistence === 'full') this.save();
      this.render();
      return true;
    }

    submit() {
      var s = this.state;
      if (this.isLocked()) return this.showResults();
      if (s.phase !== 'InProgress') return false;
      var unanswered = this.total() - this.answeredCount();
      if (unanswered > 0 && s.remaining > 0 &&
          !window.confirm('You have ' + unanswered + ' unanswered question(s). Submit anyway?')) {
        return false;
      }
      this.finalize();
      return true;
    }

    finalize() {
      var s = this.state;
      if (s.phase !== 'InProgress') return;
      this.flushTime();
      s.enteredAt = null;
      s.phase = 'Submitted';
      if (this.timerId !== null) { window.clearInterval(this.timerId); this.timerId = null; }
      s.report = scoreQuiz(this.questions, s.answers);
      this.save();
      this.render();
      this.showResults();
    }

    review() {
      var s = this.state;
      if (s.phase !== 'Submitted') return false;
      s.phase = 'Reviewing';
      var modal = byId(IDS.result_modal);
      if (modal) modal.classList.remove('open');
      this.render();
      return true;
    }

    retake() {
      this.clearSaved();
      window.location.reload();
    }

    showResults() {
      var r = this.state.report;
      if (!r) return false;
      var spent = this.state.timeSpent.reduce(function (a, b) { return a + b; }, 0);
      var attempted = r.correct + r.wrong;
      var items = [];
      items.push(['Score', round2(r.raw) + ' / ' + round2(r.max)]);
      items.push(['Percentage', r.percentage.toFixed(2) + '%']);
      items.push(['Est. percentile*', r.percentile.toFixed(1)]);
      items.push(['Correct', r.correct]);
      items.push(['Wrong', r.wrong]);
      items.push(['Unanswered', r.unanswered]);
      items.push(['Accuracy', (attempted ? (100 * r.correct / attempted).toFixed(1) : '0.0') + '%']);
      items.push(['Time taken', clock(spent)]);
      var metrics = byId(IDS.metrics);
      if (metrics) {
        metrics.innerHTML = items.map(function (item) {
          return '<div class="metric"><div class="metric-value">' + item[1] +
            '</div><div class="metric-label">' + item[0] + '</div></div>';
        }).join('');
      }
      var modal = byId(IDS.result_modal);
      if (modal) modal.classList.add('open');
      return true;
    }

    togglePalette() {
      var el = byId(IDS.mobile_palette);
      if (el) el.classList.toggle('open');
    }

    closePalette() {
      var el = byId(IDS.mobile_palette);
      if (el) el.classList.remove('open');
    }

    toggleTheme() {
      var dark = document.body.classList.toggle('dark-mode');
      try { window.localStorage.setItem(THEME_KEY, dark ? 'dark' : 'light'); } catch (e) { }
      this.renderThemeLabel();
    }

    applyTheme() {
      var mode = null;
      try { mode = window.localStorage.getItem(THEME_KEY); } catch (e) { }
      if (mode === 'dark') document.body.classList.add('dark-mode');
      this.renderThemeLabel();
    }

    renderThemeLabel() {
      var btn = byId(IDS.theme_toggle);
      if (btn) btn.textContent = document.body.classList.contains('dark-mode') ? '☀️ Light' : '🌙 Dark';
    }

    renderTimer() {
      var el = byId(IDS.timer);
      if (!el) return;
      el.textContent = '⏱ ' + clock(this.state.remaining);
      el.classList.toggle('warning', this.state.phase === 'InProgress' && this.state.remaining <= 60);
    }

    render() {
      this.renderQuestion();
      this.renderPalettes();
      this.renderNav();
      this.renderTimer();
      var count = this.total() || CONFIG.fallbackCount;
      document.querySelectorAll('.question-count').forEach(function (el) { el.textContent = count; });
    }

    renderQuestion() {
      var area = byId(IDS.question);
      if (!area) return;
      var s = this.state, q = this.questions[s.current];
      if (!q) {
        area.innerHTML = '<div class="q-text">No questions found in this quiz.</div>';
        return;
      }
      var locked = this.isLocked();
      var correct = correctOf(q);
      var chosen = has(s.answers, s.current) ? s.answers[s.current] : null;
      var marks = CONFIG.negativeMarking === 'fractional' ? weightOf(q) : CONFIG.positiveMark;
      var html = '<div class="q-header"><span>Question ' + (s.current + 1) + ' of ' + this.total() +
        (s.marked[s.current] ? ' 🔖' : '') + '</span><span class="q-marks">+' + round2(marks) + '</span></div>';
      html += '<div class="q-timer">⏱ Time on question: ' + clock(s.timeSpent[s.current]) + '</div>';
      html += '<div class="q-text">' + q.question + '</div>';
      html += '<ul id="' + IDS.options + '" class="options">';
      (q.options || []).forEach(function (text, i) {
        var n = i + 1, cls = 'option';
        if (chosen === n) cls += ' selected';
        if (locked) {
          cls += ' locked';
          if (n === correct) cls += ' correct';
          else if (chosen === n) cls += ' wrong';
        }
        html += '<li class="' + cls + '" data-option="' + n + '"><input type="radio" name="quiz-option"' +
          (chosen === n ? ' checked' : '') + (locked ? ' disabled' : '') + '> <span>' + text + '</span></li>';
      });
      html += '</ul>';
      if (s.phase === 'Reviewing' && q.explanation) {
        html += '<div class="explanation">💡 ' + q.explanation + '</div>';
      }
      area.innerHTML = html;
    }

    paletteClass(i) {
      var s = this.state, cls = 'q-num';
      if (this.isLocked()) {
        var c = correctOf(this.questions[i]);
        if (has(s.answers, i)) cls += (c !== null && s.answers[i] === c) ? ' correct' : ' wrong';
      } else if (s.marked[i]) {
        cls += ' reviewed';
      } else if (has(s.answers, i)) {
        cls += ' answered';
      } else if (s.visited[i]) {
        cls += ' viewed';
      }
      if (i === s.current) cls += ' current';
      return cls;
    }

    renderPalettes() {
      var self = this;
      [IDS.palette, IDS.mobile_palette].forEach(function (id) {
        var root = byId(id);
        if (!root) return;
        var grid = root.querySelector('.q-numbers') || root;
        var html = '';
        for (var i = 0; i < self.total(); i++) {
          html += '<button type="button" class="' + self.paletteClass(i) + '" data-index="' + i + '">' + (i + 1) + '</button>';
        }
        grid.innerHTML = html;
      });
    }

    renderNav() {
      var s = this.state, locked = this.isLocked();
      var prev = byId(IDS.prev), next = byId(IDS.next), mark = byId(IDS.mark), submit = byId(IDS.submit);
      if (prev) prev.disabled = s.phase === 'NotStarted' || s.current === 0;
      if (next) next.disabled = s.phase === 'NotStarted' || s.current + 1 >= this.total();
      if (mark) {
        mark.disabled = s.phase !== 'InProgress';
        mark.classList.toggle('active', !!s.marked[s.current]);
      }
      if (submit) submit.textContent = locked ? '📊 Results' : 'Submit';
    }

    bind() {
      var self = this;
      function click(id, fn) {
        var el = byId(id);
        if (el && !el.hasAttribute('onclick')) el.addEventListener('click', fn);
      }
      click(IDS.prev, function () { self.prev(); });
      click(IDS.next, function () { self.next(); });
      click(IDS.mark, function () { self.toggleMark(); });
      click(IDS.submit, function () { self.submit(); });
      click(IDS.palette_toggle, function () { self.togglePalette(); });
      click(IDS.theme_toggle, function () { self.toggleTheme(); });

      document.addEventListener('click', function (ev) {
        var target = ev.target;
        if (!target || !target.closest) return;
        var jump = target.closest('[data-index]');
        if (jump && (inside(IDS.palette, jump) || inside(IDS.mobile_palette, jump))) {
          self.goto(Number(jump.getAttribute('data-index')));
          return;
        }
        var option = target.closest('[data-option]');
        if (option && inside(IDS.question, option)) {
          self.select(Number(option.getAttribute('data-option')));
          return;
        }
        var action = target.closest('[data-action]');
        if (action) {
          var name = action.getAttribute('data-action');
          if (name === 'review') self.review();
          else if (name === 'retake') self.retake();
        }
      });

      document.addEventListener('keydown', function (ev) {
        var tag = (ev.target && ev.target.tagName) || '';
        if (tag === 'INPUT' || tag === 'TEXTAREA') return;
        if (ev.key === 'ArrowRight') self.next();
        else if (ev.key === 'ArrowLeft') self.prev();
        else if (/^[1-9]$/.test(ev.key)) self.select(Number(ev.key));
      });

      window.addEventListener('resize', function () {
        if (window.innerWidth > 768) self.closePalette();
      });
    }
  }

  var engine = new QuizController(QUESTIONS);
  window.quizEngine = engine;
  Object.keys(CONFIG.handlers).forEach(function (name) {
    var method = CONFIG.handlers[name];
    if (typeof window[name] !== 'function') {
      window[name] = function () { return engine[method].apply(engine, arguments); };
    }
  });

  function boot() {
    engine.load();
    engine.bind();
    engine.applyTheme();
    if (engine.startScreen()) {
      engine.setLayoutVisible(false);
      engine.render();
    } else {
      engine.start();
    }
  }

  if (document.readyState === 'loading') document.addEventListener('DOMContentLoaded', boot);
  else boot();
})();
"##;
