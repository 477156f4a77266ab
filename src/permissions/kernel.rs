//! Per-call authorization: policy dispatch, confirmation and side effects.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{
    ModeState, PermissionDecision, PermissionMode, PermissionResult, PermissionRule,
    PermissionUpdate, PersistOutcome, PlanFile, PolicySnapshot, RuleSet, RulePersister, matches,
};
use crate::config::{SettingsLoader, SettingsPaths};
use crate::confirmation::{
    ConfirmationHandler, approval_request, collect_answers, confirm_with_cancel,
    plan_exit_request, question_request, resolve_approval, resolve_plan_exit,
};
use crate::security::{SafeZone, decompose};
use crate::tools::{AskUserQuestionInput, ToolCall, ToolKind, ToolName};

/// Inputs of a single check.
#[derive(Debug, Clone, Copy)]
pub struct PermissionContext<'a> {
    pub mode: PermissionMode,
    pub zone: &'a SafeZone,
    pub rules: &'a RuleSet,
    pub plan_file: Option<&'a PlanFile>,
}

/// Decide a tool call from explicit inputs. Pure apart from path resolution.
pub fn check_permission(call: &ToolCall, ctx: &PermissionContext<'_>) -> PermissionResult {
    let name = call.name();
    match call {
        ToolCall::Bash(input) => check_bash(&input.command, ctx),
        ToolCall::Write(_)
        | ToolCall::Edit(_)
        | ToolCall::MultiEdit(_)
        | ToolCall::Delete(_)
        | ToolCall::NotebookEdit(_) => match call.target_path() {
            Some(path) => check_file_mutation(name, path, ctx),
            None => PermissionResult::needs_confirmation(name, "No target path"),
        },
        ToolCall::Read(_) | ToolCall::Glob(_) | ToolCall::Grep(_) | ToolCall::Ls(_) => {
            check_read(name, call.target_path(), ctx)
        }
        ToolCall::ExitPlanMode(_) => {
            if ctx.mode.is_read_only() {
                PermissionResult::allowed(name, "Plan mode")
            } else {
                PermissionResult::blocked(name, "ExitPlanMode is only available in plan mode")
            }
        }
        ToolCall::AskUserQuestion(_) => {
            if ctx.mode.allows_all() {
                PermissionResult::blocked(name, "AskUserQuestion is unavailable when bypassing permissions")
            } else {
                PermissionResult::allowed(name, "Questions are always permitted")
            }
        }
    }
}

fn check_bash(command: &str, ctx: &PermissionContext<'_>) -> PermissionResult {
    let name = ToolName::Bash;
    if ctx.mode.is_read_only() {
        return PermissionResult::blocked(name, "Shell commands are blocked in plan mode");
    }
    if ctx.mode.allows_all() {
        return PermissionResult::allowed(name, "Bypassing permissions");
    }

    let complex = match decompose(command) {
        Ok(complex) => complex,
        Err(e) => {
            tracing::debug!(command, error = %e, "Command could not be decomposed");
            return PermissionResult::needs_confirmation(name, command);
        }
    };

    let unmatched: Vec<_> = complex
        .iter()
        .filter(|cmd| !matches(cmd, ctx.rules, ctx.zone))
        .collect();

    match unmatched.as_slice() {
        [] => PermissionResult::allowed(name, "All commands matched"),
        [single] if !single.has_expansion => PermissionResult::needs_confirmation(name, command)
            .with_suggestion(PermissionUpdate::AddRule(PermissionRule::bash(&single.raw_text))),
        _ => PermissionResult::needs_confirmation(name, command),
    }
}

fn check_file_mutation(name: ToolName, path: &Path, ctx: &PermissionContext<'_>) -> PermissionResult {
    if ctx.mode.is_read_only() {
        return match ctx.plan_file {
            Some(plan) if plan.is_target(path, ctx.zone.working_dir()) => {
                PermissionResult::allowed(name, "Plan file")
            }
            _ => PermissionResult::blocked(name, "Only the plan file may be edited in plan mode"),
        };
    }

    if !ctx.zone.contains(path) {
        return PermissionResult::needs_confirmation(
            name,
            format!("{} is outside the working directories", path.display()),
        );
    }
    if ctx.mode.auto_approves_files() {
        return PermissionResult::allowed(name, format!("{} mode", ctx.mode));
    }
    if ctx.rules.allows_tool(name) {
        return PermissionResult::allowed(name, format!("Allowed by rule {}", name));
    }
    PermissionResult::needs_confirmation(name, format!("{} {}", name, path.display()))
        .with_suggestion(PermissionUpdate::SetMode(PermissionMode::AcceptEdits))
}

fn check_read(name: ToolName, path: Option<&Path>, ctx: &PermissionContext<'_>) -> PermissionResult {
    let Some(path) = path else {
        return PermissionResult::allowed(name, "Working directory");
    };
    if ctx.mode.allows_all() || ctx.zone.contains(path) {
        return PermissionResult::allowed(name, "Inside working directories");
    }
    if ctx.rules.allows_tool(name) {
        return PermissionResult::allowed(name, format!("Allowed by rule {}", name));
    }
    if let Some(plan) = ctx.plan_file
        && plan.is_target(path, ctx.zone.working_dir())
    {
        return PermissionResult::allowed(name, "Plan file");
    }
    PermissionResult::needs_confirmation(
        name,
        format!("{} is outside the working directories", path.display()),
    )
}

/// Tools offered to the model in `mode`.
pub fn offered_tools(mode: PermissionMode) -> Vec<ToolName> {
    ToolName::ALL
        .into_iter()
        .filter(|tool| match tool.kind() {
            ToolKind::PlanExit => mode == PermissionMode::Plan,
            ToolKind::Question => !mode.allows_all(),
            _ => true,
        })
        .collect()
}

/// Final decision of [`PermissionKernel::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub decision: PermissionDecision,
    /// Non-fatal problems, such as a rule that could not be saved.
    pub warnings: Vec<String>,
}

/// Authorization kernel of one session or subagent.
///
/// Owns its mode; the policy snapshot is swapped whole on reload and rule
/// writes go through a persister shared with the rest of the session tree.
/// Rules granted during the session survive every reload, whether or not
/// the writer has saved them yet.
#[derive(Debug)]
pub struct PermissionKernel {
    mode: ModeState,
    snapshot: RwLock<Arc<PolicySnapshot>>,
    session_rules: RwLock<RuleSet>,
    persister: RulePersister,
    paths: SettingsPaths,
    session_root_id: String,
}

impl PermissionKernel {
    /// Load settings for `paths` and start the rule writer.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn load(paths: SettingsPaths, session_root_id: impl Into<String>) -> Self {
        let settings = SettingsLoader::new(paths.clone()).load().await;
        let snapshot = settings.to_snapshot(paths.project_dir());
        let persister = RulePersister::spawn(paths.local());
        Self::new(snapshot, persister, paths, session_root_id)
    }

    pub fn new(
        snapshot: PolicySnapshot,
        persister: RulePersister,
        paths: SettingsPaths,
        session_root_id: impl Into<String>,
    ) -> Self {
        Self {
            mode: ModeState::new(snapshot.default_mode),
            snapshot: RwLock::new(Arc::new(snapshot)),
            session_rules: RwLock::new(RuleSet::new()),
            persister,
            paths,
            session_root_id: session_root_id.into(),
        }
    }

    pub fn with_mode(self, mode: PermissionMode) -> Self {
        self.mode.set(mode);
        self
    }

    pub fn mode(&self) -> PermissionMode {
        self.mode.get()
    }

    pub fn set_mode(&self, mode: PermissionMode) -> PermissionMode {
        self.mode.set(mode)
    }

    pub fn cycle_mode(&self) -> PermissionMode {
        self.mode.cycle()
    }

    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.snapshot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn session_root_id(&self) -> &str {
        &self.session_root_id
    }

    pub fn plan_file(&self) -> PlanFile {
        PlanFile::for_session(&self.snapshot().plans_dir, &self.session_root_id)
    }

    pub fn offered_tools(&self) -> Vec<ToolName> {
        offered_tools(self.mode())
    }

    #[instrument(skip(self, call), fields(tool = %call.name()))]
    pub fn check(&self, call: &ToolCall) -> PermissionResult {
        let snapshot = self.snapshot();
        let plan_file = PlanFile::for_session(&snapshot.plans_dir, &self.session_root_id);
        let ctx = PermissionContext {
            mode: self.mode(),
            zone: &snapshot.zone,
            rules: &snapshot.rules,
            plan_file: Some(&plan_file),
        };
        let result = check_permission(call, &ctx);
        tracing::debug!(mode = %ctx.mode, status = ?result.status, reason = %result.reason, "Permission checked");
        result
    }

    /// Check the loose `toolName`/`toolInput` boundary form.
    ///
    /// Unknown tools and malformed input are denied, which sends them to confirmation.
    pub fn decide(&self, tool_name: &str, tool_input: Value) -> PermissionDecision {
        match ToolCall::from_parts(tool_name, tool_input) {
            Ok(call) => self.check(&call).to_decision(),
            Err(e) => {
                tracing::debug!(tool = tool_name, error = %e, "Unrecognised tool call");
                PermissionDecision::deny(format!("Unrecognised tool call {}: {}", tool_name, e))
            }
        }
    }

    /// Re-read every settings layer and swap in the new snapshot.
    pub async fn reload(&self) -> Arc<PolicySnapshot> {
        let settings = SettingsLoader::new(self.paths.clone()).load().await;
        let mut next = settings.to_snapshot(self.paths.project_dir());
        next.rules
            .extend(self.session_rules.read().unwrap_or_else(|e| e.into_inner()).clone());
        let next = Arc::new(next);
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&next);
        tracing::debug!(rules = next.rules.len(), "Permission settings reloaded");
        next
    }

    /// Apply the side effects of a user's decision.
    ///
    /// Nothing happens unless the decision allows. A rule is applied in memory
    /// even when it cannot be saved; the failure is returned as a warning.
    pub async fn apply_decision(&self, decision: &PermissionDecision) -> Vec<String> {
        let mut warnings = Vec::new();
        if !decision.is_allowed() {
            return warnings;
        }

        self.mode.apply(decision);

        if let Some(rule) = &decision.new_permission_rule {
            self.session_rules
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(rule.clone());
            {
                let mut snapshot = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
                if !snapshot.rules.contains(rule) {
                    *snapshot = Arc::new(snapshot.with_rule(rule.clone()));
                }
            }
            match self.persister.persist(rule.clone()).await {
                Ok(PersistOutcome::Added) => {}
                Ok(PersistOutcome::AlreadyPresent) => {
                    tracing::debug!(rule = %rule, "Rule already persisted");
                }
                Err(e) => {
                    tracing::warn!(rule = %rule, error = %e, "Rule applied for this session only");
                    warnings.push(format!("Could not save rule {}: {}", rule, e));
                }
            }
        }
        warnings
    }

    /// Check, confirm when needed, and apply the answer.
    #[instrument(skip(self, call, handler, cancel), fields(tool = %call.name()))]
    pub async fn authorize<H>(
        &self,
        call: &ToolCall,
        handler: &H,
        cancel: &CancellationToken,
    ) -> Authorization
    where
        H: ConfirmationHandler + ?Sized,
    {
        let result = self.check(call);

        let decision = if result.is_blocked() {
            result.to_decision()
        } else if matches!(call, ToolCall::ExitPlanMode(_)) {
            let plan = self.plan_file();
            let content = plan.read().await;
            let outcome = confirm_with_cancel(handler, plan_exit_request(&plan, content), cancel).await;
            resolve_plan_exit(&outcome)
        } else if result.is_allowed() {
            result.to_decision()
        } else {
            let outcome = confirm_with_cancel(handler, approval_request(call, &result), cancel).await;
            resolve_approval(&result, &outcome)
        };

        let warnings = self.apply_decision(&decision).await;
        Authorization { decision, warnings }
    }

    /// Put the agent's questions to the user and collect the answers,
    /// keyed by question text.
    pub async fn ask_user<H>(
        &self,
        input: &AskUserQuestionInput,
        handler: &H,
        cancel: &CancellationToken,
    ) -> crate::Result<BTreeMap<String, String>>
    where
        H: ConfirmationHandler + ?Sized,
    {
        let result = self.check(&ToolCall::AskUserQuestion(input.clone()));
        if result.is_blocked() {
            return Err(crate::Error::Permission(result.reason));
        }
        let request = question_request(input)?;
        let outcome = confirm_with_cancel(handler, request, cancel).await;
        Ok(collect_answers(input, &outcome)?)
    }

    /// Kernel for a subagent: its own mode, the current snapshot, and the same
    /// rule writer.
    pub fn spawn_subagent(&self, mode: Option<PermissionMode>) -> PermissionKernel {
        PermissionKernel {
            mode: ModeState::new(mode.unwrap_or_else(|| self.mode())),
            snapshot: RwLock::new(self.snapshot()),
            session_rules: RwLock::new(
                self.session_rules.read().unwrap_or_else(|e| e.into_inner()).clone(),
            ),
            persister: self.persister.clone(),
            paths: self.paths.clone(),
            session_root_id: self.session_root_id.clone(),
        }
    }
}
