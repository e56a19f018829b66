mod cached_diff;
mod workspace_diff;
