//! Diesel table definitions for the entities in spec.md §3.

diesel::table! {
    tenants (id) {
        id -> Text,
        status -> Text,
    }
}

diesel::table! {
    llm_provider_models (id) {
        id -> Text,
        provider_tag -> Text,
        model_name -> Text,
        context_window -> Integer,
        cost_per_input_token -> Double,
        cost_per_output_token -> Double,
        active -> Integer,
        base_url_override -> Nullable<Text>,
    }
}

diesel::table! {
    tenant_llm_bindings (tenant_id) {
        tenant_id -> Text,
        llm_model_id -> Text,
        api_key_ciphertext -> Binary,
        api_key_nonce -> Binary,
        rpm_hint -> Nullable<Integer>,
        tpm_hint -> Nullable<Integer>,
    }
}

diesel::table! {
    tool_specs (id) {
        id -> Text,
        name -> Text,
        base_kind -> Text,
        endpoint_template -> Nullable<Text>,
        static_headers -> Text,
        timeout_secs -> Integer,
        input_schema -> Text,
        output_format -> Text,
        active -> Integer,
    }
}

diesel::table! {
    agent_specs (id) {
        id -> Text,
        name -> Text,
        system_prompt -> Text,
        llm_model_id -> Text,
        handler_class -> Text,
        active -> Integer,
    }
}

diesel::table! {
    agent_tools (agent_id, tool_id) {
        agent_id -> Text,
        tool_id -> Text,
        priority -> Integer,
    }
}

diesel::table! {
    tenant_agent_grants (tenant_id, agent_id) {
        tenant_id -> Text,
        agent_id -> Text,
        enabled -> Integer,
    }
}

diesel::table! {
    tenant_tool_grants (tenant_id, tool_id) {
        tenant_id -> Text,
        tool_id -> Text,
        enabled -> Integer,
    }
}

diesel::table! {
    sessions (id) {
        id -> Text,
        tenant_id -> Text,
        user_id -> Text,
        last_agent -> Nullable<Text>,
        thread_id -> Text,
        created_at -> Text,
        last_activity_at -> Text,
    }
}

diesel::table! {
    messages (id) {
        id -> Text,
        session_id -> Text,
        role -> Text,
        text -> Text,
        created_at -> Text,
        metadata -> Text,
    }
}

diesel::joinable!(tenant_llm_bindings -> llm_provider_models (llm_model_id));
diesel::joinable!(agent_specs -> llm_provider_models (llm_model_id));
diesel::joinable!(sessions -> tenants (tenant_id));
diesel::joinable!(messages -> sessions (session_id));

diesel::allow_tables_to_appear_in_same_query!(
    tenants,
    llm_provider_models,
    tenant_llm_bindings,
    tool_specs,
    agent_specs,
    agent_tools,
    tenant_agent_grants,
    tenant_tool_grants,
    sessions,
    messages,
);
