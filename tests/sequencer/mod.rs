mod cherry_pick_commits;
mod stopped_sequence;
