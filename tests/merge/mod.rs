mod conflicted_merge;
mod fast_forward;
