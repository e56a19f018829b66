mod plumbing_objects;
