use crate::config::McpConfig;
use crate::mcp::{failure, instructions, json_result, retain_enabled_tools, text_result};
use crate::obsidian::ObsidianClient;
use crate::obsidian::error::ObsidianError;
use crate::obsidian::models::{PatchOperation, Period, TargetType};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_handler, tool_router,
};
use serde_json::{Value, json};
use tracing::instrument;

pub const TOOL_PREFIX: &str = "obsidian_";

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AppendRequest {
    #[schemars(description = "Content to append")]
    pub content: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct PatchRequest {
    #[schemars(description = "Operation: append, prepend, replace")]
    pub operation: String,
    #[schemars(description = "Target type: heading, block, frontmatter")]
    pub target_type: String,
    #[schemars(description = "Target selector (e.g., heading name)")]
    pub target: String,
    #[schemars(description = "Content to patch")]
    pub content: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SearchSimpleRequest {
    #[schemars(description = "Search query")]
    pub query: String,
    #[serde(default, deserialize_with = "crate::mcp::whole_number")]
    #[schemars(description = "Length of context to return")]
    pub context_length: Option<u32>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SearchJsonLogicRequest {
    #[schemars(
        description = r#"JsonLogic query (as a JSON string), e.g. {"or": [{"===": [{"var": "frontmatter.url"}, "https://myurl.com/some/path/"]}, {"glob": [{"var": "frontmatter.url-glob"}, "https://myurl.com/some/path/"]}]}"#
    )]
    pub query: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SearchDataviewRequest {
    #[schemars(description = "Dataview DQL query, e.g. TABLE file.mtime FROM #project SORT file.mtime DESC")]
    pub query: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct FileRequest {
    #[schemars(description = "Path to the file")]
    pub path: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ListFilesRequest {
    #[serde(default)]
    #[schemars(description = "Directory path (empty for root)")]
    pub path: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct WriteFileRequest {
    #[schemars(description = "Path to the file")]
    pub path: String,
    #[schemars(description = "Content of the file")]
    pub content: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct OpenFileRequest {
    #[schemars(description = "Path to the file")]
    pub path: String,
    #[serde(default)]
    #[schemars(description = "Open in a new leaf (tab)")]
    pub new_leaf: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ExecuteCommandRequest {
    #[schemars(description = "ID of the command to execute")]
    pub command_id: String,
}

#[derive(Clone, Debug)]
pub struct ObsidianMcp {
    tool_router: ToolRouter<ObsidianMcp>,
    client: ObsidianClient,
    instructions: String,
}

#[tool_router]
impl ObsidianMcp {
    pub fn new(client: ObsidianClient, config: &McpConfig) -> Self {
        let mut tool_router = Self::tool_router();
        retain_enabled_tools(&mut tool_router, config, TOOL_PREFIX);
        let instructions = instructions(
            "This server provides access to an Obsidian vault through the Local REST API plugin.",
            &tool_router,
        );

        Self {
            tool_router,
            client,
            instructions,
        }
    }

    #[tool(
        name = "obsidian_get_active_file",
        description = "Get the content of the currently active file in Obsidian",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn get_active_file(&self) -> Result<CallToolResult, McpError> {
        match self.client.active_file().get_note().await {
            Ok(note) => json_result(&note),
            Err(err) => failure("get active file", err),
        }
    }

    #[tool(
        name = "obsidian_append_active_file",
        description = "Append content to the currently active file"
    )]
    #[instrument(skip_all)]
    async fn append_active_file(
        &self,
        Parameters(AppendRequest { content }): Parameters<AppendRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.active_file().append(&content).await {
            Ok(()) => text_result("Content appended successfully"),
            Err(err) => failure("append to active file", err),
        }
    }

    #[tool(name = "obsidian_patch_active_file", description = "Patch the currently active file")]
    #[instrument(skip(self, content))]
    async fn patch_active_file(
        &self,
        Parameters(PatchRequest {
            operation,
            target_type,
            target,
            content,
        }): Parameters<PatchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let operation: PatchOperation = operation.parse().map_err(invalid_params)?;
        let target_type: TargetType = target_type.parse().map_err(invalid_params)?;

        match self
            .client
            .active_file()
            .patch(operation, target_type, &target, &content)
            .await
        {
            Ok(()) => text_result("File patched successfully"),
            Err(err) => failure("patch active file", err),
        }
    }

    #[tool(
        name = "obsidian_search_simple",
        description = "Search the vault for files matching a query",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn search_simple(
        &self,
        Parameters(SearchSimpleRequest {
            query,
            context_length,
        }): Parameters<SearchSimpleRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .search()
            .simple(&query, context_length.unwrap_or(0))
            .await
        {
            Ok(results) => json_result(&json!({ "results": results })),
            Err(err) => failure("search", err),
        }
    }

    #[tool(
        name = "obsidian_search_json_logic",
        description = "Search the vault using JsonLogic",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn search_json_logic(
        &self,
        Parameters(SearchJsonLogicRequest { query }): Parameters<SearchJsonLogicRequest>,
    ) -> Result<CallToolResult, McpError> {
        let query: Value = match serde_json::from_str(&query) {
            Ok(query) => query,
            Err(err) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "invalid JSON logic query: {}",
                    err
                ))]));
            }
        };

        match self.client.search().json_logic(&query).await {
            Ok(results) => json_result(&json!({ "results": results })),
            Err(err) => failure("search", err),
        }
    }

    #[tool(
        name = "obsidian_search_dataview",
        description = "Search the vault using a Dataview DQL query (requires the Dataview plugin)",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn search_dataview(
        &self,
        Parameters(SearchDataviewRequest { query }): Parameters<SearchDataviewRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.search().dataview(&query).await {
            Ok(results) => json_result(&json!({ "results": results })),
            Err(err) => failure("search", err),
        }
    }

    #[tool(
        name = "obsidian_get_daily_note",
        description = "Get the content of today's daily note",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn get_daily_note(&self) -> Result<CallToolResult, McpError> {
        match self.client.periodic().get_current_note(Period::Daily).await {
            Ok(note) => json_result(&note),
            Err(err) => failure("get daily note", err),
        }
    }

    #[tool(
        name = "obsidian_get_file",
        description = "Get the content of a specific file in the vault",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn get_file(
        &self,
        Parameters(FileRequest { path }): Parameters<FileRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.vault().get_note(&path).await {
            Ok(note) => json_result(&note),
            Err(err) => failure("get file", err),
        }
    }

    #[tool(
        name = "obsidian_list_files",
        description = "List files in a directory",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn list_files(
        &self,
        Parameters(ListFilesRequest { path }): Parameters<ListFilesRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.vault().list(path.as_deref().unwrap_or_default()).await {
            Ok(files) => json_result(&json!({ "files": files })),
            Err(err) => failure("list files", err),
        }
    }

    #[tool(
        name = "obsidian_create_or_update_file",
        description = "Create a new file or update an existing one"
    )]
    #[instrument(skip(self, content))]
    async fn create_or_update_file(
        &self,
        Parameters(WriteFileRequest { path, content }): Parameters<WriteFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.vault().create(&path, &content).await {
            Ok(()) => text_result("File created/updated successfully"),
            Err(err) => failure("create/update file", err),
        }
    }

    #[tool(name = "obsidian_open_file", description = "Open a file in Obsidian UI")]
    #[instrument(skip(self))]
    async fn open_file(
        &self,
        Parameters(OpenFileRequest { path, new_leaf }): Parameters<OpenFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .open()
            .file(&path, new_leaf.unwrap_or(false))
            .await
        {
            Ok(()) => text_result("File opened successfully"),
            Err(err) => failure("open file", err),
        }
    }

    #[tool(
        name = "obsidian_list_commands",
        description = "List the commands available in Obsidian",
        annotations(read_only_hint = true)
    )]
    #[instrument(skip(self))]
    async fn list_commands(&self) -> Result<CallToolResult, McpError> {
        match self.client.commands().list().await {
            Ok(commands) => json_result(&json!({ "commands": commands })),
            Err(err) => failure("list commands", err),
        }
    }

    #[tool(name = "obsidian_execute_command", description = "Execute an Obsidian command by ID")]
    #[instrument(skip(self))]
    async fn execute_command(
        &self,
        Parameters(ExecuteCommandRequest { command_id }): Parameters<ExecuteCommandRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.commands().execute(&command_id).await {
            Ok(()) => text_result("Command executed successfully"),
            Err(err) => failure("execute command", err),
        }
    }
}

fn invalid_params(err: ObsidianError) -> McpError {
    McpError::invalid_params(err.to_string(), None)
}

#[tool_handler]
impl ServerHandler for ObsidianMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(self.instructions.clone()),
        }
    }
}
