//! 测验会话状态机
//!
//! 生成的评分脚本在浏览器里运行同一套规则，这里是它在 Rust 侧的实现：
//! 一个控制器持有全部会话状态，所有事件（计时、点击、导航）都是对它的同步调用。
//!
//! ```text
//! NotStarted ──start──▶ InProgress ──submit / 超时──▶ Submitted ──review──▶ Reviewing
//! ```

use crate::models::marking::MarkingScheme;
use crate::models::question::QuizQuestion;
use crate::workflow::scoring::{score, ScoreReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    Submitted,
    Reviewing,
}

/// 本地存储中保存的范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceScope {
    /// 只保存作答
    #[default]
    Answers,
    /// 同时保存访问、标记和用时
    Full,
}

impl PersistenceScope {
    pub fn as_str(self) -> &'static str {
        match self {
            PersistenceScope::Answers => "answers",
            PersistenceScope::Full => "full",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "answers" => Some(PersistenceScope::Answers),
            "full" => Some(PersistenceScope::Full),
            _ => None,
        }
    }
}

/// 单题状态（题号面板上的颜色）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Unvisited,
    Visited,
    Answered,
}

/// 交卷请求的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 还有未答题目，需要用户确认
    NeedsConfirmation { unanswered: usize },
    /// 已交卷
    Submitted(ScoreReport),
    /// 不在答题阶段，什么也没做
    Ignored,
}

/// 写入本地存储的快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub answers: BTreeMap<usize, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visited: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<Vec<u32>>,
}

/// 测验会话控制器
///
/// 与生成脚本中 `QuizController` 的方法一一对应：
///
/// | Rust | JS |
/// |---|---|
/// | `start` | `start()` |
/// | `goto` / `next` / `prev` | `goto(index)` / `next()` / `prev()` |
/// | `select` | `select(option)` |
/// | `toggle_mark` | `toggleMark()` |
/// | `tick` | `tick()`，剩余时间归零时调用 `finalize()` |
/// | `request_submit` / `confirm_submit` | `submit()`（`window.confirm`）/ `finalize()` |
/// | `review` | `review()` |
/// | `snapshot` / `restore` | `save()` / `load()`，键为 `CONFIG.storageKey` |
///
/// 阶段名（`NotStarted`、`InProgress`、`Submitted`、`Reviewing`）与脚本中
/// `state.phase` 的取值相同，元素 ID 见 `models::element_ids`。
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    scheme: MarkingScheme,
    phase: SessionPhase,
    current: usize,
    answers: BTreeMap<usize, usize>,
    visited: Vec<bool>,
    marked: Vec<bool>,
    time_spent: Vec<u32>,
    /// 当前题目尚未计入 `time_spent` 的秒数
    pending_secs: u32,
    remaining_secs: u32,
    report: Option<ScoreReport>,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>, scheme: MarkingScheme, duration_secs: u32) -> Self {
        let n = questions.len();
        Self {
            questions,
            scheme,
            phase: SessionPhase::NotStarted,
            current: 0,
            answers: BTreeMap::new(),
            visited: vec![false; n],
            marked: vec![false; n],
            time_spent: vec![0; n],
            pending_secs: 0,
            remaining_secs: duration_secs,
            report: None,
        }
    }

    // ========== 查询 ==========

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn answer(&self, index: usize) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.marked.get(index).copied().unwrap_or(false)
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        self.report.as_ref()
    }

    /// 某题累计用时，当前题包含尚未结算的部分
    pub fn time_spent(&self, index: usize) -> u32 {
        let stored = self.time_spent.get(index).copied().unwrap_or(0);
        if index == self.current {
            stored + self.pending_secs
        } else {
            stored
        }
    }

    pub fn status(&self, index: usize) -> QuestionStatus {
        if self.answers.contains_key(&index) {
            QuestionStatus::Answered
        } else if self.visited.get(index).copied().unwrap_or(false) {
            QuestionStatus::Visited
        } else {
            QuestionStatus::Unvisited
        }
    }

    pub fn unanswered_count(&self) -> usize {
        self.total() - self.answers.keys().filter(|&&i| i < self.total()).count()
    }

    pub fn can_go_prev(&self) -> bool {
        self.is_navigable() && self.current > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.is_navigable() && self.current + 1 < self.total()
    }

    // ========== 事件 ==========

    /// 开始答题
    pub fn start(&mut self) -> bool {
        if self.phase != SessionPhase::NotStarted {
            return false;
        }
        self.phase = SessionPhase::InProgress;
        if let Some(v) = self.visited.get_mut(self.current) {
            *v = true;
        }
        true
    }

    /// 跳转到任意题目，交卷前后都可以
    pub fn goto(&mut self, index: usize) -> bool {
        if !self.is_navigable() || index >= self.total() {
            return false;
        }
        self.flush_time();
        self.current = index;
        if self.phase == SessionPhase::InProgress {
            self.visited[index] = true;
        }
        true
    }

    /// 下一题，最后一题时不动
    pub fn next(&mut self) -> bool {
        self.can_go_next() && self.goto(self.current + 1)
    }

    /// 上一题，第一题时不动
    pub fn prev(&mut self) -> bool {
        self.can_go_prev() && self.goto(self.current - 1)
    }

    /// 为当前题选择 1 起始的选项，覆盖之前的选择
    pub fn select(&mut self, option: usize) -> bool {
        if self.phase != SessionPhase::InProgress {
            return false;
        }
        let Some(question) = self.questions.get(self.current) else {
            return false;
        };
        if option == 0 || option > question.options.len() {
            return false;
        }
        self.answers.insert(self.current, option);
        true
    }

    /// 切换当前题的复查标记
    pub fn toggle_mark(&mut self) -> bool {
        if self.phase != SessionPhase::InProgress {
            return false;
        }
        match self.marked.get_mut(self.current) {
            Some(flag) => {
                *flag = !*flag;
                true
            }
            None => false,
        }
    }

    /// 计时器走一秒；倒计时归零时自动交卷并返回成绩
    pub fn tick(&mut self) -> Option<ScoreReport> {
        if self.phase != SessionPhase::InProgress {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if !self.questions.is_empty() {
            self.pending_secs += 1;
        }
        if self.remaining_secs == 0 {
            return Some(self.finalize());
        }
        None
    }

    /// 手动交卷：有未答题目且时间未到时需要确认
    pub fn request_submit(&mut self) -> SubmitOutcome {
        if self.phase != SessionPhase::InProgress {
            return SubmitOutcome::Ignored;
        }
        let unanswered = self.unanswered_count();
        if unanswered > 0 && self.remaining_secs > 0 {
            return SubmitOutcome::NeedsConfirmation { unanswered };
        }
        SubmitOutcome::Submitted(self.finalize())
    }

    /// 确认后交卷
    pub fn confirm_submit(&mut self) -> SubmitOutcome {
        if self.phase != SessionPhase::InProgress {
            return SubmitOutcome::Ignored;
        }
        SubmitOutcome::Submitted(self.finalize())
    }

    /// 进入复查
    pub fn review(&mut self) -> bool {
        if self.phase != SessionPhase::Submitted {
            return false;
        }
        self.flush_time();
        self.phase = SessionPhase::Reviewing;
        true
    }

    // ========== 持久化 ==========

    /// 按保存范围生成快照
    pub fn snapshot(&self, scope: PersistenceScope) -> SessionSnapshot {
        match scope {
            PersistenceScope::Answers => SessionSnapshot {
                answers: self.answers.clone(),
                ..SessionSnapshot::default()
            },
            PersistenceScope::Full => SessionSnapshot {
                answers: self.answers.clone(),
                visited: Some(self.visited.clone()),
                marked: Some(self.marked.clone()),
                time_spent: Some((0..self.total()).map(|i| self.time_spent(i)).collect()),
            },
        }
    }

    pub fn snapshot_json(&self, scope: PersistenceScope) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot(scope))
    }

    /// 从快照恢复，只在开始前有效；越界的作答和长度不符的数组被丢弃
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> bool {
        if self.phase != SessionPhase::NotStarted {
            return false;
        }
        let n = self.total();
        self.answers = snapshot
            .answers
            .into_iter()
            .filter(|&(index, option)| {
                index < n && option >= 1 && option <= self.questions[index].options.len()
            })
            .collect();
        if let Some(visited) = snapshot.visited.filter(|v| v.len() == n) {
            self.visited = visited;
        }
        if let Some(marked) = snapshot.marked.filter(|v| v.len() == n) {
            self.marked = marked;
        }
        if let Some(time_spent) = snapshot.time_spent.filter(|v| v.len() == n) {
            self.time_spent = time_spent;
        }
        true
    }

    pub fn restore_json(&mut self, json: &str) -> serde_json::Result<bool> {
        let snapshot: SessionSnapshot = serde_json::from_str(json)?;
        Ok(self.restore(snapshot))
    }

    fn is_navigable(&self) -> bool {
        self.phase != SessionPhase::NotStarted && !self.questions.is_empty()
    }

    fn flush_time(&mut self) {
        if let Some(stored) = self.time_spent.get_mut(self.current) {
            *stored += self.pending_secs;
        }
        self.pending_secs = 0;
    }

    fn finalize(&mut self) -> ScoreReport {
        self.flush_time();
        let report = score(&self.questions, &self.answers, &self.scheme);
        self.phase = SessionPhase::Submitted;
        self.report = Some(report.clone());
        report
    }
}
