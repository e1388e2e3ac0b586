// src/policy/openai.rs

//! OpenAI-compatible Chat Completions classifier. One non-streaming call per
//! turn with the two pipeline tools attached; a tool call picks the branch,
//! plain content means a conversational answer.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::CONFIG;
use crate::context::WorkspaceContext;
use crate::policy::{policy_tools, ClassifierPolicy, PolicyReply, Question, Scope};
use crate::proposal::DraftOperation;

pub struct OpenAiPolicy {
    client: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiPolicy {
    pub fn from_config() -> Self {
        Self {
            client: HttpClient::new(),
            base_url: CONFIG.openai_base_url.clone(),
            api_key: CONFIG.openai_api_key.clone(),
            model: CONFIG.model.clone(),
        }
    }

    fn system_prompt(scope: &Scope, context: &WorkspaceContext) -> String {
        let scope_rules = match scope {
            Scope::Global => "You may propose task, note, project and file operations.".to_string(),
            Scope::Tasks => "This conversation is about tasks only. Propose task operations and nothing else.".to_string(),
            Scope::Notes => "This conversation is about notes only. Propose note operations and nothing else.".to_string(),
            Scope::Project { project_id } => format!(
                "This conversation is scoped to project {}. Propose task and note operations only; new items belong to that project.",
                project_id
            ),
        };

        format!(
            "You are a personal workspace assistant. Decide whether the user's message \
             needs clarification, calls for concrete workspace changes, or is ordinary \
             conversation.\n\n\
             Rules:\n\
             - {scope_rules}\n\
             - Never invent entity ids; use ids from the workspace snapshot below.\n\
             - Reference projects by their id or by a life domain name (Body, Mind, Work, Home).\n\
             - Files are uploaded by the user. You may move a file to another project or \
               propose deleting it, never create one.\n\
             - Projects are fixed. Only their description can change.\n\
             - A note's content cannot change after creation; only its title and project can.\n\
             - Dates are YYYY-MM-DD. Times are 24-hour HH:MM. A task without a time is all-day.\n\
             - Titles are at most 50 characters, project descriptions at most 200.\n\
             - When intent is ambiguous, call ask_questions instead of guessing.\n\n\
             {context}",
            scope_rules = scope_rules,
            context = context.render()
        )
    }
}

#[async_trait]
impl ClassifierPolicy for OpenAiPolicy {
    async fn classify(
        &self,
        message: &str,
        scope: &Scope,
        context: &WorkspaceContext,
    ) -> Result<PolicyReply> {
        let body = json!({
            "model": self.model,
            "max_tokens": CONFIG.max_output_tokens,
            "messages": [
                { "role": "system", "content": Self::system_prompt(scope, context) },
                { "role": "user", "content": message },
            ],
            "tools": policy_tools(),
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("classifier API error {}: {}", status, error_text));
        }

        let payload: Value = response.json().await?;
        let message = payload["choices"]
            .get(0)
            .and_then(|c| c.get("message"))
            .ok_or_else(|| anyhow!("classifier response has no choices"))?;

        if let Some(call) = message["tool_calls"].get(0) {
            let name = call["function"]["name"].as_str().unwrap_or_default();
            let raw_args = call["function"]["arguments"].as_str().unwrap_or("{}");
            let args: Value = serde_json::from_str(raw_args)
                .map_err(|e| anyhow!("malformed {} arguments: {}", name, e))?;
            debug!(tool = name, "classifier chose a tool");

            return match name {
                "ask_questions" => {
                    let questions: Vec<Question> =
                        serde_json::from_value(args["questions"].clone())
                            .map_err(|e| anyhow!("malformed questions: {}", e))?;
                    Ok(PolicyReply::Clarify(questions))
                }
                "propose_operations" => {
                    let summary = args["summary"].as_str().unwrap_or_default().to_string();
                    let drafts: Vec<DraftOperation> =
                        serde_json::from_value(args["operations"].clone())
                            .map_err(|e| anyhow!("malformed operations: {}", e))?;
                    Ok(PolicyReply::Propose { summary, drafts })
                }
                other => Err(anyhow!("classifier called unknown tool {}", other)),
            };
        }

        let content = message["content"].as_str().unwrap_or_default().to_string();
        Ok(PolicyReply::Answer(content))
    }
}
