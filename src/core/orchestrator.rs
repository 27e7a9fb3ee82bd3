//! 生成编排器：八字分析、取名批次、单名详情
//!
//! 负责：前置条件检查、构建提示词、经 RetryPolicy 调用模型、校验响应、通过 SessionService 合并持久化，
//! 并维护 AiState（进行中标志、错误信息、一次性重试命令），经 watch 通道广播给 UI。

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::watch;

use crate::config::{reload_config, AppConfig, LlmSection};
use crate::core::error::GenerationError;
use crate::core::recovery::{RecoveryAction, RecoveryEngine};
use crate::core::state::{AiState, GenerationStage, RetryCommand};
use crate::core::unlock::is_unlocked;
use crate::domain::{
    now_millis, BaziAnalysis, NameCandidate, NameDetail, NameListResponse, Session, SessionPatch,
};
use crate::llm::{create_llm_from_config, CompletionRequest, LlmClient, LlmError, RetryPolicy};
use crate::prompts::{bazi_analysis_prompt, name_detail_prompt, name_list_prompt, PromptPair};
use crate::session::{SessionError, SessionService};
use crate::validation::{validate_response, ResponseSchema};

/// 单类请求的采样温度与超时
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestSettings {
    pub temperature: f32,
    pub timeout: Duration,
}

/// 三类请求的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub bazi: RequestSettings,
    pub names: RequestSettings,
    pub detail: RequestSettings,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            bazi: RequestSettings {
                temperature: 0.7,
                timeout: Duration::from_secs(30),
            },
            names: RequestSettings {
                temperature: 0.8,
                timeout: Duration::from_secs(45),
            },
            detail: RequestSettings {
                temperature: 0.7,
                timeout: Duration::from_secs(30),
            },
        }
    }
}

impl GenerationSettings {
    pub fn from_config(llm: &LlmSection) -> Self {
        Self {
            bazi: RequestSettings {
                temperature: llm.temperature.bazi,
                timeout: Duration::from_secs(llm.timeouts.bazi),
            },
            names: RequestSettings {
                temperature: llm.temperature.names,
                timeout: Duration::from_secs(llm.timeouts.names),
            },
            detail: RequestSettings {
                temperature: llm.temperature.detail,
                timeout: Duration::from_secs(llm.timeouts.detail),
            },
        }
    }

    fn for_stage(&self, stage: GenerationStage) -> RequestSettings {
        match stage {
            GenerationStage::Bazi => self.bazi,
            GenerationStage::Names => self.names,
            GenerationStage::Detail => self.detail,
        }
    }
}

/// 手动重试成功后重新得到的产物
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    BaziAnalysis(BaziAnalysis),
    NameBatch(Vec<NameCandidate>),
    CharacterDetail(NameCandidate),
}

/// 进行中登记的键：同一会话的同一操作（含风格 / 名字参数）
type InFlightKey = RetryCommand;

/// 生成编排器
pub struct Orchestrator {
    /// 可替换：修好配置后换入新客户端，「未配置」错误即可重试成功
    llm: RwLock<Arc<dyn LlmClient>>,
    sessions: SessionService,
    retry_policy: RetryPolicy,
    settings: GenerationSettings,
    recovery: RecoveryEngine,
    state: watch::Sender<AiState>,
    in_flight: Mutex<HashSet<InFlightKey>>,
}

/// 进行中登记；drop 时撤销登记并刷新对应标志，覆盖所有退出路径
struct InFlightGuard<'a> {
    orchestrator: &'a Orchestrator,
    key: InFlightKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.leave(&self.key);
    }
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, sessions: SessionService) -> Self {
        let (state, _) = watch::channel(AiState::default());
        Self {
            llm: RwLock::new(llm),
            sessions,
            retry_policy: RetryPolicy::default(),
            settings: GenerationSettings::default(),
            recovery: RecoveryEngine::new(),
            state,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_config(cfg: &AppConfig, llm: Arc<dyn LlmClient>, sessions: SessionService) -> Self {
        Self::new(llm, sessions)
            .with_retry_policy(RetryPolicy::from_config(&cfg.retry))
            .with_settings(GenerationSettings::from_config(&cfg.llm))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    fn llm(&self) -> Arc<dyn LlmClient> {
        self.llm
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 换入新的 LLM 客户端；进行中的调用继续使用旧客户端
    pub fn replace_llm(&self, llm: Arc<dyn LlmClient>) {
        *self.llm.write().unwrap_or_else(|e| e.into_inner()) = llm;
        tracing::info!("LLM client replaced");
    }

    /// 重新加载配置（文件 + 环境变量）并据此重建 LLM 客户端
    pub fn reload_llm(&self) -> Result<(), config::ConfigError> {
        let cfg = reload_config()?;
        self.replace_llm(create_llm_from_config(&cfg.llm));
        Ok(())
    }

    /// 当前状态快照
    pub fn state(&self) -> AiState {
        self.state.borrow().clone()
    }

    /// 订阅状态变化（UI 渲染用）
    pub fn subscribe(&self) -> watch::Receiver<AiState> {
        self.state.subscribe()
    }

    /// 清除错误信息、重试命令与计数
    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.clear_error());
    }

    /// 八字分析；会话已有分析时直接返回，不调用模型
    pub async fn produce_bazi_analysis(
        &self,
        session_id: &str,
    ) -> Result<BaziAnalysis, GenerationError> {
        let command = RetryCommand::BaziAnalysis {
            session_id: session_id.to_string(),
        };
        self.guarded(command, true, self.bazi_analysis(session_id)).await
    }

    /// 为某个风格生成 1 个精选 + 5 个摘要名字；每次都会调用模型
    pub async fn produce_name_batch(
        &self,
        session_id: &str,
        style: &str,
    ) -> Result<Vec<NameCandidate>, GenerationError> {
        let command = RetryCommand::NameBatch {
            session_id: session_id.to_string(),
            style: style.to_string(),
        };
        self.guarded(command, true, self.name_batch(session_id, style))
            .await
    }

    /// 按需加载某个名字的逐字详情；已有完整详情时直接返回
    pub async fn produce_character_detail(
        &self,
        session_id: &str,
        name_id: &str,
    ) -> Result<NameCandidate, GenerationError> {
        let command = RetryCommand::CharacterDetail {
            session_id: session_id.to_string(),
            name_id: name_id.to_string(),
        };
        self.guarded(command, true, self.character_detail(session_id, name_id))
            .await
    }

    /// 手动重试上一次失败的操作（每个错误至多一次）
    ///
    /// 没有重试命令时返回 `Ok(None)`；重试再次失败则进入终止态并返回底层错误。
    pub async fn retry(&self) -> Result<Option<RetryOutcome>, GenerationError> {
        let snapshot = self.state();
        let Some(command) = snapshot.retry_command else {
            return Ok(None);
        };

        if snapshot.retry_count >= 1 {
            tracing::warn!(stage = command.stage().as_str(), "Manual retry budget already used");
            self.state.send_modify(|s| s.mark_terminal());
            return Err(GenerationError::RetryExhausted);
        }

        self.state.send_modify(|s| {
            s.retry_count += 1;
            s.error = None;
        });
        tracing::info!(
            stage = command.stage().as_str(),
            session_id = %command.session_id(),
            "Manual retry"
        );

        match self.replay(&command).await {
            Ok(outcome) => {
                self.state.send_modify(|s| s.clear_error());
                Ok(Some(outcome))
            }
            Err(err) => {
                tracing::warn!(error = %err, "Manual retry failed, giving up");
                self.state.send_modify(|s| s.mark_terminal());
                Err(err)
            }
        }
    }

    async fn replay(&self, command: &RetryCommand) -> Result<RetryOutcome, GenerationError> {
        let cmd = command.clone();
        match command {
            RetryCommand::BaziAnalysis { session_id } => self
                .guarded(cmd, false, self.bazi_analysis(session_id))
                .await
                .map(RetryOutcome::BaziAnalysis),
            RetryCommand::NameBatch { session_id, style } => self
                .guarded(cmd, false, self.name_batch(session_id, style))
                .await
                .map(RetryOutcome::NameBatch),
            RetryCommand::CharacterDetail {
                session_id,
                name_id,
            } => self
                .guarded(cmd, false, self.character_detail(session_id, name_id))
                .await
                .map(RetryOutcome::CharacterDetail),
        }
    }

    /// 统一外壳：进行中登记与标志、新请求清空旧错误、失败时写入错误状态
    async fn guarded<T, Fut>(
        &self,
        command: RetryCommand,
        fresh: bool,
        work: Fut,
    ) -> Result<T, GenerationError>
    where
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let _guard = self.enter(&command)?;
        if fresh {
            self.state.send_modify(|s| s.clear_error());
        }

        let result = work.await;
        if let Err(err) = &result {
            self.record_failure(err, &command);
        }
        result
    }

    fn enter(&self, command: &RetryCommand) -> Result<InFlightGuard<'_>, GenerationError> {
        let stage = command.stage();
        let key = command.clone();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(key.clone()) {
            tracing::warn!(
                session_id = %command.session_id(),
                stage = stage.as_str(),
                "Generation already in flight"
            );
            return Err(GenerationError::AlreadyInFlight(stage.as_str().to_string()));
        }
        self.state.send_modify(|s| s.set_generating(stage, true));
        Ok(InFlightGuard {
            orchestrator: self,
            key,
        })
    }

    fn leave(&self, key: &InFlightKey) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(key);
        let stage = key.stage();
        let still_running = in_flight.iter().any(|k| k.stage() == stage);
        self.state.send_modify(|s| s.set_generating(stage, still_running));
    }

    fn record_failure(&self, err: &GenerationError, command: &RetryCommand) {
        let stage = command.stage();
        match self.recovery.handle(err, stage) {
            RecoveryAction::OfferRetry(message) => {
                tracing::error!(stage = stage.as_str(), error = %err, "Generation failed");
                self.state.send_modify(|s| {
                    s.error = Some(message);
                    s.retry_command = Some(command.clone());
                });
            }
            RecoveryAction::Surface(message) => {
                tracing::warn!(stage = stage.as_str(), error = %err, "Generation precondition failed");
                self.state.send_modify(|s| {
                    s.error = Some(message);
                    s.retry_command = None;
                });
            }
            RecoveryAction::Ignore => {}
        }
    }

    fn ensure_configured(&self) -> Result<(), GenerationError> {
        if self.llm().is_configured() {
            Ok(())
        } else {
            Err(GenerationError::not_configured())
        }
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<Session>, GenerationError> {
        Ok(self.sessions.get(session_id).await?)
    }

    async fn bazi_analysis(&self, session_id: &str) -> Result<BaziAnalysis, GenerationError> {
        let session = self
            .load_session(session_id)
            .await?
            .ok_or(GenerationError::NoActiveSession)?;

        if let Some(analysis) = session.bazi_analysis {
            tracing::info!(session_id = %session_id, "Bazi analysis cache hit");
            return Ok(analysis);
        }
        self.ensure_configured()?;

        tracing::info!(session_id = %session_id, "Generating bazi analysis");
        let prompt = bazi_analysis_prompt(&session.baby_info);
        let analysis: BaziAnalysis = self.request(&prompt, GenerationStage::Bazi).await?;

        self.sessions
            .update(session_id, SessionPatch::analysis(analysis.clone()))
            .await?;
        tracing::info!(
            session_id = %session_id,
            pillars = %analysis.pillars().join(" "),
            styles = analysis.suggested_styles().len(),
            "Bazi analysis stored"
        );
        Ok(analysis)
    }

    async fn name_batch(
        &self,
        session_id: &str,
        style: &str,
    ) -> Result<Vec<NameCandidate>, GenerationError> {
        let session = self
            .load_session(session_id)
            .await?
            .ok_or_else(GenerationError::missing_prerequisite)?;
        let analysis = session
            .bazi_analysis
            .as_ref()
            .ok_or_else(GenerationError::missing_prerequisite)?;
        self.ensure_configured()?;

        tracing::info!(session_id = %session_id, style = %style, "Generating name batch");
        let prompt = name_list_prompt(&session.baby_info, &analysis.summary(), style);
        let response: NameListResponse = self.request(&prompt, GenerationStage::Names).await?;

        let mut batch = Vec::new();
        self.sessions
            .update_with(session_id, |current| {
                let unlocked = is_unlocked(current.unlocked_series.as_slice(), style);
                batch = build_batch(response, current, style, unlocked);
                Ok(SessionPatch::names(current.names_with_batch(style, &batch)))
            })
            .await?;

        tracing::info!(
            session_id = %session_id,
            style = %style,
            count = batch.len(),
            "Name batch stored"
        );
        Ok(batch)
    }

    async fn character_detail(
        &self,
        session_id: &str,
        name_id: &str,
    ) -> Result<NameCandidate, GenerationError> {
        let session = self
            .load_session(session_id)
            .await?
            .ok_or(GenerationError::NoActiveSession)?;
        let existing = session
            .find_name(name_id)
            .ok_or_else(|| GenerationError::NameNotFound(name_id.to_string()))?;

        if existing.has_complete_detail() {
            tracing::debug!(name_id = %name_id, "Name detail cache hit");
            return Ok(existing.clone());
        }
        let analysis = session
            .bazi_analysis
            .as_ref()
            .ok_or_else(GenerationError::missing_prerequisite)?;
        self.ensure_configured()?;

        tracing::info!(session_id = %session_id, name = %existing.name, "Loading name detail");
        let prompt = name_detail_prompt(&existing.name, &session.baby_info, &analysis.summary());
        let detail: NameDetail = self.request(&prompt, GenerationStage::Detail).await?;

        let mut merged = None;
        self.sessions
            .update_with(session_id, |current| {
                let mut candidate = current
                    .find_name(name_id)
                    .cloned()
                    .ok_or_else(|| SessionError::NameNotFound(name_id.to_string()))?;
                candidate.merge_detail(detail);
                let names = current.names_with_replaced(&candidate);
                merged = Some(candidate);
                Ok(SessionPatch::names(names))
            })
            .await?;

        merged.ok_or_else(|| GenerationError::NameNotFound(name_id.to_string()))
    }

    /// 调用模型（带自动重试与超时）并校验为目标类型
    async fn request<T: ResponseSchema>(
        &self,
        prompt: &PromptPair,
        stage: GenerationStage,
    ) -> Result<T, GenerationError> {
        let settings = self.settings.for_stage(stage);
        let request = CompletionRequest {
            system: prompt.system.clone(),
            user: prompt.user.clone(),
            temperature: settings.temperature,
            timeout: settings.timeout,
        };
        let req = &request;

        let raw = self
            .retry_policy
            .run(|| self.complete_with_timeout(req))
            .await?;
        Ok(validate_response::<T>(&raw)?)
    }

    async fn complete_with_timeout(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let llm = self.llm();
        match tokio::time::timeout(request.timeout, llm.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(request.timeout)),
        }
    }
}

/// 组装一批候选：精选名永远解锁，摘要名按解锁状态决定
fn build_batch(
    response: NameListResponse,
    session: &Session,
    style: &str,
    unlocked: bool,
) -> Vec<NameCandidate> {
    let stamp = batch_stamp(session);
    let last_name = session.baby_info.last_name.as_str();

    let mut batch = Vec::with_capacity(response.others.len() + 1);
    batch.push(NameCandidate::featured(
        response.featured,
        format!("name-{stamp}-0"),
        last_name,
        style,
    ));
    for (i, summary) in response.others.into_iter().enumerate() {
        batch.push(NameCandidate::summary(
            summary,
            format!("name-{stamp}-{}", i + 1),
            last_name,
            style,
            !unlocked,
        ));
    }
    batch
}

/// 毫秒时间戳；与会话中已有批次冲突时顺延
fn batch_stamp(session: &Session) -> i64 {
    let mut stamp = now_millis();
    loop {
        let prefix = format!("name-{stamp}-");
        if !session.names.iter().any(|n| n.id.starts_with(&prefix)) {
            return stamp;
        }
        stamp += 1;
    }
}
